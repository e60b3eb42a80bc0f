//! Bot configuration

use std::time::Duration;

use menugen_common::config::{base_url, env_lookup, parse_or, ConfigError};

/// Outlasts the API's own page generation, which may retry the generator
/// three times at 10s each.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 45;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the menu API
    pub api_url: String,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            api_url: base_url(&lookup, "API_URL", "http://localhost:8000")?,
            http_timeout: Duration::from_secs(parse_or(
                &lookup,
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
        })
    }
}
