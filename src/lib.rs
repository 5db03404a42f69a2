pub mod config;
pub mod error;
pub mod experiments;

pub use config::ResolverConfig;
pub use error::{Result, StickyabError};
pub use experiments::analytics::{AnalyticsEvent, AnalyticsSink, DataLayer, TracingSink};
pub use experiments::assignment::{
    resolve, Assignment, AssignmentSource, ExperimentResolver, ResolveRequest, Resolution,
    ResolvedExperiment,
};
pub use experiments::catalog::Catalog;
pub use experiments::config::{Eligibility, Experiment, ExperimentError, Variant};
pub use experiments::cookie::{
    CookieReader, CookieWrite, CookieWriter, DocumentCookieStore, HeaderCookieStore,
};
pub use experiments::weighted::weighted_random;
