//! Weighted random selection over index-stable weight lists.
//!
//! Entries are never removed: "try another one" is expressed by zeroing an
//! entry's weight, so positions keep referring to the same catalog entry.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Pick an index with probability `weights[i] / sum(weights)`.
///
/// A weight of exactly 0 is never picked. Returns `None` when the slice is
/// empty, every weight is zero, or any weight is negative or not finite.
pub fn weighted_random<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    if weights.iter().any(|w| !w.is_finite()) {
        return None;
    }
    let dist: WeightedIndex<f64> = WeightedIndex::new(weights.iter().copied()).ok()?;
    Some(dist.sample(rng))
}

/// Per-resolution copy of a weight list.
///
/// Owns its own allocation so zeroing entries during retries never touches the
/// shared catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedDraw {
    weights: Vec<f64>,
}

impl WeightedDraw {
    pub fn new(weights: Vec<f64>) -> Self {
        Self { weights }
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        weighted_random(&self.weights, rng)
    }

    /// Draw and zero the picked entry so it cannot repeat.
    pub fn take<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        let index = self.draw(rng)?;
        self.exclude(index);
        Some(index)
    }

    pub fn exclude(&mut self, index: usize) {
        if let Some(w) = self.weights.get_mut(index) {
            *w = 0.0;
        }
    }

    #[cfg(test)]
    fn remaining(&self) -> usize {
        self.weights.iter().filter(|w| **w > 0.0).count()
    }

    #[cfg(test)]
    fn weights(&self) -> &[f64] {
        &self.weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn empty_weights_select_nothing() {
        assert_eq!(weighted_random(&[], &mut rng()), None);
    }

    #[test]
    fn all_zero_weights_select_nothing() {
        assert_eq!(weighted_random(&[0.0, 0.0, 0.0], &mut rng()), None);
    }

    #[test]
    fn negative_weight_selects_nothing() {
        assert_eq!(weighted_random(&[1.0, -1.0], &mut rng()), None);
    }

    #[test]
    fn nan_weight_selects_nothing() {
        assert_eq!(weighted_random(&[1.0, f64::NAN], &mut rng()), None);
    }

    #[test]
    fn single_positive_weight_always_selected() {
        let mut r = rng();
        for _ in 0..500 {
            assert_eq!(weighted_random(&[0.0, 0.0, 2.5, 0.0], &mut r), Some(2));
        }
    }

    #[test]
    fn zero_weight_never_selected() {
        let mut r = rng();
        for _ in 0..5_000 {
            let picked = weighted_random(&[1.0, 0.0, 1.0], &mut r).unwrap();
            assert_ne!(picked, 1);
        }
    }

    #[test]
    fn distribution_follows_weights_1_to_3() {
        let mut r = rng();
        let n = 40_000;
        let mut counts = [0usize; 2];
        for _ in 0..n {
            counts[weighted_random(&[1.0, 3.0], &mut r).unwrap()] += 1;
        }
        let ratio = counts[1] as f64 / counts[0] as f64;
        assert!((ratio - 3.0).abs() < 0.25, "ratio was {}", ratio);
    }

    #[test]
    fn take_never_repeats() {
        let mut r = rng();
        let mut draw = WeightedDraw::new(vec![1.0, 1.0, 1.0, 1.0]);
        let mut seen = Vec::new();
        while let Some(i) = draw.take(&mut r) {
            assert!(!seen.contains(&i));
            seen.push(i);
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(draw.remaining(), 0);
    }

    #[test]
    fn exclude_out_of_range_is_ignored() {
        let mut draw = WeightedDraw::new(vec![1.0]);
        draw.exclude(5);
        assert_eq!(draw.weights(), &[1.0]);
    }

    #[test]
    fn exclude_leaves_source_untouched() {
        let source = vec![1.0, 2.0];
        let mut draw = WeightedDraw::new(source.clone());
        draw.exclude(0);
        assert_eq!(source, vec![1.0, 2.0]);
        assert_eq!(draw.weights(), &[0.0, 2.0]);
    }
}
