use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use super::config::{Experiment, ExperimentError};

/// On-disk catalog shape: either a bare array or `{"experiments": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    List(Vec<Experiment>),
    Wrapped { experiments: Vec<Experiment> },
}

/// Validated, read-only list of experiments. Positions are stable and are
/// what an assignment's `experiment_index` refers to.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    experiments: Vec<Experiment>,
}

impl Catalog {
    pub fn new(experiments: Vec<Experiment>) -> Result<Self, ExperimentError> {
        for experiment in &experiments {
            experiment.validate()?;
        }

        let mut ids = HashSet::new();
        for experiment in &experiments {
            if !ids.insert(experiment.experiment_id.as_str()) {
                return Err(ExperimentError::InvalidConfig(format!(
                    "duplicate experimentID '{}'",
                    experiment.experiment_id
                )));
            }
        }

        let mut names_on_routes = HashSet::new();
        for experiment in &experiments {
            for route in &experiment.route_names {
                if !names_on_routes.insert((experiment.name.as_str(), route.as_str())) {
                    return Err(ExperimentError::InvalidConfig(format!(
                        "experiment name '{}' is used twice on route '{}'",
                        experiment.name, route
                    )));
                }
            }
        }

        Ok(Self { experiments })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json_str(data: &str) -> Result<Self, ExperimentError> {
        let experiments = match serde_json::from_str::<CatalogDocument>(data)? {
            CatalogDocument::List(experiments) => experiments,
            CatalogDocument::Wrapped { experiments } => experiments,
        };
        Self::new(experiments)
    }

    pub fn load(path: &Path) -> Result<Self, ExperimentError> {
        let data = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&data)?;
        tracing::info!(
            path = %path.display(),
            experiments = catalog.len(),
            "Experiment catalog loaded"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Experiment> {
        self.experiments.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Experiment> {
        self.experiments.iter()
    }

    pub fn find_by_name_on_route(&self, name: &str, route: &str) -> Option<(usize, &Experiment)> {
        self.experiments
            .iter()
            .enumerate()
            .find(|(_, e)| e.name == name && e.runs_on(route))
    }

    pub fn find_by_id(&self, experiment_id: &str) -> Option<(usize, &Experiment)> {
        self.experiments
            .iter()
            .enumerate()
            .find(|(_, e)| e.experiment_id == experiment_id)
    }

    pub fn get_by_id(&self, experiment_id: &str) -> Result<&Experiment, ExperimentError> {
        self.find_by_id(experiment_id)
            .map(|(_, e)| e)
            .ok_or_else(|| ExperimentError::NotFound(experiment_id.to_string()))
    }

    pub fn for_route<'a>(&'a self, route: &'a str) -> impl Iterator<Item = &'a Experiment> + 'a {
        self.experiments.iter().filter(move |e| e.runs_on(route))
    }

    /// Fresh weight vector for one resolution on `route`. Experiments that do
    /// not run on the route start at zero.
    pub fn route_weights(&self, route: &str) -> Vec<f64> {
        self.experiments
            .iter()
            .map(|e| if e.runs_on(route) { e.weight } else { 0.0 })
            .collect()
    }
}
