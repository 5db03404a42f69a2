//! Experiment resolution: which experiment and variants apply to a visitor on
//! a route, and whether the route cookie needs rewriting.
//!
//! Stages, each short-circuiting the ones after it:
//! 1. manual override from the query string (always rewrites the cookie)
//! 2. restore from the route cookie
//! 3. weighted experiment draw, retrying past ineligible experiments
//! 4. weighted variant completion up to `sections`
//! 5. cookie reconciliation (write only when the encoding changed)
//!
//! [`resolve`] is pure apart from the caller-supplied RNG. [`ExperimentResolver`]
//! wires it to a cookie store.

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;

use super::catalog::Catalog;
use super::config::{Experiment, Variant};
use super::cookie::{
    cookie_name, encode_assignment, parse_assignment, CookieReader, CookieWrite, CookieWriter,
};
use super::overrides::parse_override;
use super::weighted::WeightedDraw;
use crate::config::ResolverConfig;

/// How the final assignment was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentSource {
    Manual,
    Cookie,
    Drawn,
    None,
}

/// Inputs of one resolution. `query_override` and `cookie` are raw values,
/// already looked up by the caller.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    pub route: &'a str,
    pub query_override: Option<&'a str>,
    pub cookie: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct Assignment<'c> {
    experiment_index: Option<usize>,
    experiment: Option<&'c Experiment>,
    variant_indexes: Vec<usize>,
    source: AssignmentSource,
}

#[derive(Debug, Clone)]
pub struct Resolution<'c> {
    pub assignment: Assignment<'c>,
    pub cookie_write: Option<CookieWrite>,
}

/// Owned, serializable view of an assignment handed to the rendering layer.
/// The experiment's own fields are flattened in when one is active.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedExperiment {
    pub experiment_index: Option<usize>,
    pub variant_indexes: Vec<usize>,
    pub active_variants: Vec<Variant>,
    pub classification_tags: Vec<String>,
    #[serde(flatten)]
    pub experiment: Option<Experiment>,
}

impl<'c> Assignment<'c> {
    pub fn none() -> Self {
        Self {
            experiment_index: None,
            experiment: None,
            variant_indexes: Vec::new(),
            source: AssignmentSource::None,
        }
    }

    fn active(
        experiment_index: usize,
        experiment: &'c Experiment,
        variant_indexes: Vec<usize>,
        source: AssignmentSource,
    ) -> Self {
        Self {
            experiment_index: Some(experiment_index),
            experiment: Some(experiment),
            variant_indexes,
            source,
        }
    }

    pub fn is_active(&self) -> bool {
        self.experiment.is_some()
    }

    pub fn experiment_index(&self) -> Option<usize> {
        self.experiment_index
    }

    pub fn experiment(&self) -> Option<&'c Experiment> {
        self.experiment
    }

    pub fn variant_indexes(&self) -> &[usize] {
        &self.variant_indexes
    }

    pub fn source(&self) -> AssignmentSource {
        self.source
    }

    pub fn active_variants(&self) -> Vec<&'c Variant> {
        let Some(experiment) = self.experiment else {
            return Vec::new();
        };
        self.variant_indexes
            .iter()
            .filter_map(|&i| experiment.variants.get(i))
            .collect()
    }

    pub fn classification_tags(&self, tag_prefix: &str) -> Vec<String> {
        let Some(experiment) = self.experiment else {
            return Vec::new();
        };
        self.variant_indexes
            .iter()
            .map(|i| format!("{}{}-{}", tag_prefix, experiment.name, i))
            .collect()
    }

    /// `<experimentID>.<i>-<j>...`, or `None` when no experiment is active.
    pub fn cookie_value(&self) -> Option<String> {
        self.experiment
            .map(|e| encode_assignment(&e.experiment_id, &self.variant_indexes))
    }

    pub fn context(&self, tag_prefix: &str) -> ResolvedExperiment {
        ResolvedExperiment {
            experiment_index: self.experiment_index,
            variant_indexes: self.variant_indexes.clone(),
            active_variants: self.active_variants().into_iter().cloned().collect(),
            classification_tags: self.classification_tags(tag_prefix),
            experiment: self.experiment.cloned(),
        }
    }
}

impl<'c> Resolution<'c> {
    fn inactive() -> Self {
        Self {
            assignment: Assignment::none(),
            cookie_write: None,
        }
    }
}

pub fn resolve<'c, R: Rng + ?Sized>(
    catalog: &'c Catalog,
    config: &ResolverConfig,
    request: &ResolveRequest<'_>,
    rng: &mut R,
) -> Resolution<'c> {
    let route = request.route;
    let name = cookie_name(&config.cookie_prefix, route);
    let max_age_for =
        |experiment: &Experiment| experiment.max_age.unwrap_or(config.default_max_age_secs);

    if let Some((index, experiment, variant)) = manual_override(catalog, request) {
        let variant_indexes = vec![variant];
        let value = encode_assignment(&experiment.experiment_id, &variant_indexes);
        tracing::debug!(route, experiment = %experiment.name, variant, "manual override applied");
        return Resolution {
            cookie_write: Some(CookieWrite {
                name,
                value,
                max_age: max_age_for(experiment),
            }),
            assignment: Assignment::active(index, experiment, variant_indexes, AssignmentSource::Manual),
        };
    }

    let (index, experiment, candidates, source) = match restore_from_cookie(catalog, request) {
        Some((index, experiment, candidates)) => {
            (index, experiment, candidates, AssignmentSource::Cookie)
        }
        None => match draw_experiment(catalog, route, rng) {
            Some((index, experiment)) => (index, experiment, Vec::new(), AssignmentSource::Drawn),
            None => {
                tracing::debug!(route, "no eligible experiment");
                return Resolution::inactive();
            }
        },
    };

    let Some(variant_indexes) = complete_variants(experiment, candidates, rng) else {
        tracing::warn!(
            route,
            experiment = %experiment.name,
            "could not fill every section, leaving visitor unassigned"
        );
        return Resolution::inactive();
    };

    let value = encode_assignment(&experiment.experiment_id, &variant_indexes);
    let cookie_write = if request.cookie == Some(value.as_str()) {
        None
    } else {
        Some(CookieWrite {
            name,
            value,
            max_age: max_age_for(experiment),
        })
    };

    tracing::debug!(
        route,
        experiment = %experiment.name,
        ?variant_indexes,
        ?source,
        rewrite = cookie_write.is_some(),
        "experiment resolved"
    );

    Resolution {
        assignment: Assignment::active(index, experiment, variant_indexes, source),
        cookie_write,
    }
}

/// Overrides only apply to experiments listed on the current route and to
/// in-bounds variants. Sections collapse to one.
fn manual_override<'c>(
    catalog: &'c Catalog,
    request: &ResolveRequest<'_>,
) -> Option<(usize, &'c Experiment, usize)> {
    let requested = parse_override(request.query_override?)?;
    let (index, experiment) =
        catalog.find_by_name_on_route(&requested.experiment_name, request.route)?;
    if requested.variant_index >= experiment.variants.len() {
        return None;
    }
    Some((index, experiment, requested.variant_index))
}

fn restore_from_cookie<'c>(
    catalog: &'c Catalog,
    request: &ResolveRequest<'_>,
) -> Option<(usize, &'c Experiment, Vec<usize>)> {
    let persisted = parse_assignment(request.cookie?)?;
    let (index, experiment) = catalog.find_by_id(&persisted.experiment_id)?;
    if !experiment.runs_on(request.route) {
        return None;
    }
    Some((index, experiment, persisted.variant_indexes))
}

/// At most `catalog.len()` draws. Each draw rejected by the experiment's
/// eligibility predicate zeroes that experiment's weight in a private copy.
fn draw_experiment<'c, R: Rng + ?Sized>(
    catalog: &'c Catalog,
    route: &str,
    rng: &mut R,
) -> Option<(usize, &'c Experiment)> {
    let mut weights = WeightedDraw::new(catalog.route_weights(route));
    for _ in 0..catalog.len() {
        let index = weights.draw(rng)?;
        let experiment = catalog.get(index)?;
        if experiment.eligible_for(route) {
            return Some((index, experiment));
        }
        tracing::debug!(route, experiment = %experiment.name, "not eligible, redrawing");
        weights.exclude(index);
    }
    None
}

/// Keep valid, distinct candidates (at most `sections`), then draw the rest
/// without replacement.
fn complete_variants<R: Rng + ?Sized>(
    experiment: &Experiment,
    candidates: Vec<usize>,
    rng: &mut R,
) -> Option<Vec<usize>> {
    let sections = experiment.sections;
    let mut held: Vec<usize> = Vec::with_capacity(sections);
    for index in candidates {
        if held.len() == sections {
            break;
        }
        if index < experiment.variants.len() && !held.contains(&index) {
            held.push(index);
        }
    }

    let mut weights = WeightedDraw::new(experiment.variant_weights());
    for &index in &held {
        weights.exclude(index);
    }
    while held.len() < sections {
        held.push(weights.take(rng)?);
    }
    Some(held)
}

/// Resolver bound to a shared catalog and configuration. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ExperimentResolver {
    catalog: Arc<Catalog>,
    config: ResolverConfig,
}

impl ExperimentResolver {
    pub fn new(catalog: Arc<Catalog>, config: ResolverConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Read the route cookie from `store`, resolve, and apply any cookie write
    /// back to `store`.
    pub fn resolve_with_rng<S, R>(
        &self,
        store: &mut S,
        query_override: Option<&str>,
        route: &str,
        rng: &mut R,
    ) -> Assignment<'_>
    where
        S: CookieReader + CookieWriter + ?Sized,
        R: Rng + ?Sized,
    {
        let existing = store.get_cookie(&cookie_name(&self.config.cookie_prefix, route));
        let request = ResolveRequest {
            route,
            query_override,
            cookie: existing.as_deref(),
        };
        let resolution = resolve(&self.catalog, &self.config, &request, rng);
        if let Some(write) = &resolution.cookie_write {
            store.set_cookie(write);
        }
        resolution.assignment
    }

    pub fn resolve_in<S>(&self, store: &mut S, query_override: Option<&str>, route: &str) -> Assignment<'_>
    where
        S: CookieReader + CookieWriter + ?Sized,
    {
        self.resolve_with_rng(store, query_override, route, &mut rand::thread_rng())
    }
}
