pub mod analytics;
pub mod assignment;
pub mod catalog;
pub mod config;
pub mod cookie;
pub mod overrides;
pub mod weighted;
