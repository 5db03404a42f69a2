use http::StatusCode;
use thiserror::Error;

use crate::experiments::config::ExperimentError;

#[derive(Error, Debug, Clone)]
pub enum StickyabError {
    #[error("Experiment not found: {0}")]
    ExperimentNotFound(String),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Invalid route name: {0}")]
    InvalidRoute(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StickyabError>;

impl From<std::io::Error> for StickyabError {
    fn from(e: std::io::Error) -> Self {
        StickyabError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StickyabError {
    fn from(e: serde_json::Error) -> Self {
        StickyabError::Json(e.to_string())
    }
}

impl From<ExperimentError> for StickyabError {
    fn from(e: ExperimentError) -> Self {
        match e {
            ExperimentError::NotFound(id) => StickyabError::ExperimentNotFound(id),
            ExperimentError::InvalidConfig(msg) => StickyabError::InvalidCatalog(msg),
            ExperimentError::Io(e) => StickyabError::Io(e.to_string()),
            ExperimentError::Json(e) => StickyabError::Json(e.to_string()),
        }
    }
}

impl StickyabError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StickyabError::ExperimentNotFound(_) => StatusCode::NOT_FOUND,
            StickyabError::InvalidCatalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StickyabError::InvalidRoute(_) => StatusCode::BAD_REQUEST,
            StickyabError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StickyabError::Json(_) => StatusCode::BAD_REQUEST,
            StickyabError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
