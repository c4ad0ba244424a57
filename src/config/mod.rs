//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then environment
//! variables prefixed with `MANUSCRIPT_TOOLS` (for example
//! `MANUSCRIPT_TOOLS__CROSSREF__TIMEOUT_SECS=10`). The CrossRef contact address is also read
//! from `CROSSREF_MAILTO`, which wins over every other layer.

mod file_config;

pub use file_config::{ConfigFile, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sources::{CrossRefSource, SourceError, CROSSREF_API_BASE, DOI_RESOLVER_BASE};
use crate::utils::api_retry_config;

/// Environment variable holding the CrossRef polite-pool contact address
pub const MAILTO_ENV: &str = "CROSSREF_MAILTO";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// CrossRef API settings
    #[serde(default)]
    pub crossref: CrossRefConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// CrossRef API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossRefConfig {
    /// Contact address sent with every request
    #[serde(default)]
    pub mailto: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_doi_base_url")]
    pub doi_base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Request throttle; 0 disables it
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    /// Retries for transient failures (network errors, HTTP 5xx)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for CrossRefConfig {
    fn default() -> Self {
        Self {
            mailto: None,
            base_url: default_base_url(),
            doi_base_url: default_doi_base_url(),
            timeout_secs: default_timeout_secs(),
            requests_per_second: default_rps(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_base_url() -> String {
    CROSSREF_API_BASE.to_string()
}

fn default_doi_base_url() -> String {
    DOI_RESOLVER_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_rps() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    3
}

impl CrossRefConfig {
    /// Contact address, with `CROSSREF_MAILTO` taking precedence over the config value
    pub fn mailto(&self) -> Option<String> {
        pick_mailto(std::env::var(MAILTO_ENV).ok(), self.mailto.as_deref())
    }

    /// Build a CrossRef source from these settings
    pub fn build_source(&self) -> Result<CrossRefSource, SourceError> {
        let mailto = self.mailto().ok_or_else(|| {
            SourceError::InvalidRequest(format!(
                "mailto is required for the CrossRef API. Set {} or [crossref] mailto in {}",
                MAILTO_ENV,
                default_config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "the config file".to_string())
            ))
        })?;

        for url in [&self.base_url, &self.doi_base_url] {
            url::Url::parse(url)
                .map_err(|e| SourceError::InvalidRequest(format!("Invalid URL '{}': {}", url, e)))?;
        }

        Ok(CrossRefSource::with_settings(
            mailto,
            Duration::from_secs(self.timeout_secs),
            self.requests_per_second,
        )?
        .with_base_urls(&self.base_url, &self.doi_base_url)
        .with_retry_config(api_retry_config().max_retries(self.max_retries)))
    }
}

fn pick_mailto(env: Option<String>, configured: Option<&str>) -> Option<String> {
    env.into_iter()
        .chain(configured.map(String::from))
        .map(|m| m.trim().to_string())
        .find(|m| !m.is_empty())
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when neither `-v`/`-q` nor `RUST_LOG` is given
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `"json"` for structured logs, anything else for human-readable output
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.as_deref() == Some("json")
    }
}

/// Default location of the configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("manuscript-tools").join("config.toml"))
}

/// The default configuration file, if it exists
pub fn find_config_file() -> Option<PathBuf> {
    default_config_path().filter(|path| path.exists())
}

/// Load configuration from an explicit file, or from the default location when present
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();

    match path {
        Some(path) => {
            builder = builder.add_source(config::File::from(path));
        }
        None => {
            if let Some(path) = find_config_file() {
                tracing::debug!("Using config file {}", path.display());
                builder = builder.add_source(config::File::from(path.as_path()).required(false));
            }
        }
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("MANUSCRIPT_TOOLS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Get the default configuration
pub fn get_config() -> Config {
    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.crossref.base_url, "https://api.crossref.org");
        assert_eq!(config.crossref.doi_base_url, "https://doi.org");
        assert_eq!(config.crossref.requests_per_second, 10);
        assert_eq!(config.logging.level, "warn");
        assert!(!config.logging.is_json());
    }

    #[test]
    fn test_mailto_precedence() {
        assert_eq!(
            pick_mailto(Some("env@example.com".into()), Some("file@example.com")).as_deref(),
            Some("env@example.com")
        );
        assert_eq!(
            pick_mailto(Some("  ".into()), Some("file@example.com")).as_deref(),
            Some("file@example.com")
        );
        assert_eq!(pick_mailto(None, None), None);
    }

    #[test]
    fn test_build_source_rejects_bad_url() {
        let config = CrossRefConfig {
            mailto: Some("me@example.com".to_string()),
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        let err = config.build_source().unwrap_err();
        assert!(err.to_string().contains("Invalid URL 'not a url'"));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[crossref]\nmailto = \"me@example.com\"\ntimeout_secs = 5\n\n[logging]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.crossref.mailto.as_deref(), Some("me@example.com"));
        assert_eq!(config.crossref.timeout_secs, 5);
        assert_eq!(config.crossref.max_retries, 3);
        assert!(config.logging.is_json());
    }

    #[test]
    fn test_load_config_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
