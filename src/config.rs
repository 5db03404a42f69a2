use std::env;

use crate::error::{Result, StickyabError};
use crate::experiments::cookie::is_cookie_name_char;

/// One week.
pub const DEFAULT_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 7;
pub const DEFAULT_QUERY_PARAM: &str = "experiment";
pub const DEFAULT_COOKIE_PREFIX: &str = "exp-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Cookie lifetime when an experiment sets no `maxAge` of its own.
    pub default_max_age_secs: u64,
    /// Query parameter carrying a manual override.
    pub query_param: String,
    /// Cookie name is `<cookie_prefix><routeName>`.
    pub cookie_prefix: String,
    /// Classification tags are `<tag_prefix><experimentName>-<variantIndex>`.
    pub tag_prefix: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            default_max_age_secs: DEFAULT_MAX_AGE_SECS,
            query_param: DEFAULT_QUERY_PARAM.to_string(),
            cookie_prefix: DEFAULT_COOKIE_PREFIX.to_string(),
            tag_prefix: String::new(),
        }
    }
}

impl ResolverConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let default_max_age_secs = match env::var("STICKYAB_MAX_AGE") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                StickyabError::Config(format!("STICKYAB_MAX_AGE must be whole seconds, got '{raw}'"))
            })?,
            Err(_) => defaults.default_max_age_secs,
        };
        let config = ResolverConfig {
            default_max_age_secs,
            query_param: env::var("STICKYAB_QUERY_PARAM").unwrap_or(defaults.query_param),
            cookie_prefix: env::var("STICKYAB_COOKIE_PREFIX").unwrap_or(defaults.cookie_prefix),
            tag_prefix: env::var("STICKYAB_TAG_PREFIX").unwrap_or(defaults.tag_prefix),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_max_age_secs == 0 {
            return Err(StickyabError::Config(
                "default max age must be > 0".to_string(),
            ));
        }
        if self.query_param.is_empty() {
            return Err(StickyabError::Config(
                "query parameter name must not be empty".to_string(),
            ));
        }
        if self
            .cookie_prefix
            .chars()
            .any(|c| !is_cookie_name_char(c))
        {
            return Err(StickyabError::Config(format!(
                "cookie prefix '{}' contains a character not allowed in cookie names",
                self.cookie_prefix
            )));
        }
        Ok(())
    }
}
