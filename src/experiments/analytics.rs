use std::sync::Mutex;

use serde::Serialize;

use super::assignment::Assignment;

/// Event announcing that a visitor saw an experiment. `expVar` is the variant
/// indexes joined with `-`, matching the cookie encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsEvent {
    #[serde(rename = "expId")]
    pub exp_id: String,
    #[serde(rename = "expVar")]
    pub exp_var: String,
}

impl AnalyticsEvent {
    pub fn from_assignment(assignment: &Assignment<'_>) -> Option<Self> {
        let experiment = assignment.experiment()?;
        let exp_var = assignment
            .variant_indexes()
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("-");
        Some(Self {
            exp_id: experiment.experiment_id.clone(),
            exp_var,
        })
    }
}

pub trait AnalyticsSink: Send + Sync {
    fn push(&self, event: AnalyticsEvent);
}

/// Logs each event at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn push(&self, event: AnalyticsEvent) {
        tracing::info!(exp_id = %event.exp_id, exp_var = %event.exp_var, "experiment impression");
    }
}

/// In-memory event queue, the server-side stand-in for a tag manager's data
/// layer.
#[derive(Debug, Default)]
pub struct DataLayer {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl DataLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn drain(&self) -> Vec<AnalyticsEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl AnalyticsSink for DataLayer {
    fn push(&self, event: AnalyticsEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
