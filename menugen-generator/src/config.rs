//! Generator configuration

use std::path::PathBuf;
use std::time::Duration;

use menugen_common::config::{base_url, env_lookup, parse_or, string_or, ConfigError};

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    /// Public base of published pages
    pub base_url: String,
    pub pages_dir: PathBuf,
    /// JSON mapping `{css_file -> display_name}`; built-in themes when unset
    pub themes_url: Option<String>,
    /// Where theme stylesheets and default backgrounds are hosted
    pub themes_base_url: String,
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
        let public_base = base_url(&lookup, "BASE_URL", "http://localhost:8001")?;
        let themes_url = lookup("THEMES_URL").filter(|url| !url.trim().is_empty());
        let default_themes_base = format!("{public_base}/themes");

        Ok(Self {
            listen_addr: string_or(&lookup, "LISTEN_ADDR", "0.0.0.0:8001"),
            pages_dir: PathBuf::from(string_or(&lookup, "PAGES_DIR", "./static/pages")),
            themes_url,
            themes_base_url: base_url(&lookup, "THEMES_BASE_URL", &default_themes_base)?,
            http_timeout: Duration::from_secs(parse_or(&lookup, "HTTP_TIMEOUT_SECS", 10u64)?),
            base_url: public_base,
        })
    }
}
