//! Backend configuration

use std::path::PathBuf;
use std::time::Duration;

use menugen_common::config::{base_url, env_lookup, parse_or, required, string_or, ConfigError};

const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    pub listen_addr: String,
    /// Public base used to build links to uploaded files
    pub base_url: String,
    pub upload_dir: PathBuf,
    /// Upper bound for a single uploaded file, in bytes
    pub max_upload_size: usize,
    /// Lower-cased menu file extensions without the leading dot
    pub allowed_menu_extensions: Vec<String>,
    pub generator_url: String,
    pub db_pool_size: u32,
    pub db_pool_timeout: Duration,
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
        let allowed_menu_extensions = string_or(&lookup, "ALLOWED_MENU_EXTENSIONS", "csv,xls,xlsx")
            .split(',')
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect::<Vec<_>>();
        if allowed_menu_extensions.is_empty() {
            return Err(ConfigError::Invalid {
                key: "ALLOWED_MENU_EXTENSIONS",
                reason: "at least one extension is required".to_string(),
            });
        }

        let db_pool_size = parse_or(&lookup, "DB_POOL_SIZE", 10u32)?;
        if db_pool_size == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_POOL_SIZE",
                reason: "must be positive".to_string(),
            });
        }

        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            listen_addr: string_or(&lookup, "LISTEN_ADDR", "0.0.0.0:8000"),
            base_url: base_url(&lookup, "BASE_URL", "http://localhost:8000")?,
            upload_dir: PathBuf::from(string_or(&lookup, "UPLOAD_DIR", "./files")),
            max_upload_size: parse_or(&lookup, "MAX_UPLOAD_SIZE", DEFAULT_MAX_UPLOAD_SIZE)?,
            allowed_menu_extensions,
            generator_url: base_url(&lookup, "GENERATOR_URL", "http://localhost:8001")?,
            db_pool_size,
            db_pool_timeout: Duration::from_secs(parse_or(&lookup, "DB_POOL_TIMEOUT_SECS", 5u64)?),
            http_timeout: Duration::from_secs(parse_or(&lookup, "HTTP_TIMEOUT_SECS", 10u64)?),
        })
    }

    pub fn is_allowed_menu_extension(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.allowed_menu_extensions.iter().any(|e| *e == extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|key| {
            (key == "DATABASE_URL").then(|| "postgres://localhost/menugen".to_string())
        })
        .unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:8000");
        assert_eq!(config.max_upload_size, 10 * 1024 * 1024);
        assert_eq!(config.allowed_menu_extensions, vec!["csv", "xls", "xlsx"]);
        assert_eq!(config.db_pool_size, 10);
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert!(config.is_allowed_menu_extension("XLSX"));
        assert!(!config.is_allowed_menu_extension("pdf"));
    }

    #[test]
    fn test_missing_database_url() {
        let err = Config::from_lookup(|_| None).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_extension_list_is_normalized() {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/menugen".to_string()),
            "ALLOWED_MENU_EXTENSIONS" => Some(" .CSV , xlsx,".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.allowed_menu_extensions, vec!["csv", "xlsx"]);
    }
}
