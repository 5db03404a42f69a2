use axum::{response::IntoResponse, response::Response, Json};
use stickyab::{AnalyticsSink, ExperimentResolver, StickyabError};
use std::sync::Arc;

pub mod assignment;
pub mod experiments;
pub mod health;

pub struct AppState {
    pub resolver: ExperimentResolver,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(resolver: ExperimentResolver, analytics: Arc<dyn AnalyticsSink>) -> Self {
        Self {
            resolver,
            analytics,
            start_time: std::time::Instant::now(),
        }
    }
}

/// `{"message": ...}` body with the status the error maps to.
pub(crate) fn error_response(err: StickyabError) -> Response {
    (err.status_code(), Json(serde_json::json!({ "message": err.to_string() }))).into_response()
}

pub use assignment::route_assignment;
pub use experiments::{get_experiment, list_experiments};
pub use health::health;
