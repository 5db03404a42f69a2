use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::cookie::is_cookie_value_char;

/// Route predicate deciding whether a visitor on that route may be drawn into
/// an experiment. Evaluated on every unassigned request.
#[derive(Clone)]
pub struct Eligibility(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl Eligibility {
    pub fn new(predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    pub fn allows(&self, route: &str) -> bool {
        (self.0)(route)
    }
}

impl fmt::Debug for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Eligibility(<fn>)")
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    pub name: String,
    #[serde(rename = "experimentID")]
    pub experiment_id: String,
    #[serde(alias = "routeName")]
    pub route_names: Vec<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_sections")]
    pub sections: usize,
    pub variants: Vec<Variant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
    #[serde(skip)]
    pub is_eligible: Option<Eligibility>,
}

/// One treatment. Everything besides `weight` is opaque payload handed to the
/// rendering layer untouched.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Variant {
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

fn default_weight() -> f64 {
    1.0
}

fn default_sections() -> usize {
    1
}

#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error("experiment not found: {0}")]
    NotFound(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Default for Variant {
    fn default() -> Self {
        Self::new(default_weight())
    }
}

impl Variant {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            payload: serde_json::Map::new(),
        }
    }
}

impl Experiment {
    pub fn new(name: impl Into<String>, experiment_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            experiment_id: experiment_id.into(),
            route_names: Vec::new(),
            weight: default_weight(),
            sections: default_sections(),
            variants: Vec::new(),
            max_age: None,
            is_eligible: None,
        }
    }

    pub fn on_route(mut self, route: impl Into<String>) -> Self {
        self.route_names.push(route.into());
        self
    }

    pub fn with_variants(mut self, variants: Vec<Variant>) -> Self {
        self.variants = variants;
        self
    }

    pub fn with_eligibility(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_eligible = Some(Eligibility::new(predicate));
        self
    }

    pub fn runs_on(&self, route: &str) -> bool {
        self.route_names.iter().any(|r| r == route)
    }

    /// `true` when the experiment has no predicate or its predicate accepts `route`.
    pub fn eligible_for(&self, route: &str) -> bool {
        self.is_eligible
            .as_ref()
            .map_or(true, |predicate| predicate.allows(route))
    }

    pub fn variant_weights(&self) -> Vec<f64> {
        self.variants.iter().map(|v| v.weight).collect()
    }

    pub fn validate(&self) -> Result<(), ExperimentError> {
        if self.name.is_empty() {
            return Err(ExperimentError::InvalidConfig(
                "experiment name must not be empty".to_string(),
            ));
        }
        // The override parameter is split on '-', a dashed name could never match.
        if self.name.contains('-') {
            return Err(ExperimentError::InvalidConfig(format!(
                "experiment name '{}' must not contain '-'",
                self.name
            )));
        }
        if self.experiment_id.is_empty() {
            return Err(ExperimentError::InvalidConfig(format!(
                "experiment '{}' has an empty experimentID",
                self.name
            )));
        }
        if self
            .experiment_id
            .chars()
            .any(|c| matches!(c, '.' | '=') || !is_cookie_value_char(c))
        {
            return Err(ExperimentError::InvalidConfig(format!(
                "experimentID '{}' contains a character reserved by the cookie encoding",
                self.experiment_id
            )));
        }
        if self.route_names.is_empty() {
            return Err(ExperimentError::InvalidConfig(format!(
                "experiment '{}' must list at least one route",
                self.name
            )));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(ExperimentError::InvalidConfig(format!(
                "experiment '{}' weight must be a non-negative number, got {}",
                self.name, self.weight
            )));
        }
        if self.sections == 0 {
            return Err(ExperimentError::InvalidConfig(format!(
                "experiment '{}' sections must be >= 1",
                self.name
            )));
        }
        if self.variants.is_empty() {
            return Err(ExperimentError::InvalidConfig(format!(
                "experiment '{}' has no variants",
                self.name
            )));
        }
        if let Some(bad) = self
            .variants
            .iter()
            .position(|v| !v.weight.is_finite() || v.weight < 0.0)
        {
            return Err(ExperimentError::InvalidConfig(format!(
                "experiment '{}' variant {} weight must be a non-negative number",
                self.name, bad
            )));
        }
        let drawable = self.variants.iter().filter(|v| v.weight > 0.0).count();
        if drawable < self.sections {
            return Err(ExperimentError::InvalidConfig(format!(
                "experiment '{}' declares {} sections but only {} variants have a positive weight",
                self.name, self.sections, drawable
            )));
        }
        if self.max_age == Some(0) {
            return Err(ExperimentError::InvalidConfig(format!(
                "experiment '{}' maxAge must be > 0",
                self.name
            )));
        }
        Ok(())
    }
}
