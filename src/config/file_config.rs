//! Configuration file support for manuscript-tools.
//!
//! # Configuration File Format
//!
//! ```toml
//! [crossref]
//! mailto = "you@example.edu"
//! base_url = "https://api.crossref.org"
//! doi_base_url = "https://doi.org"
//! timeout_secs = 30
//! requests_per_second = 10
//! max_retries = 3
//!
//! [logging]
//! level = "warn"
//! format = "json"
//! ```

use std::path::{Path, PathBuf};

use super::Config;

/// A configuration file on disk
#[derive(Debug)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub config: Config,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        let config = toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            config,
        })
    }

    /// Save configuration to its TOML file, creating parent directories
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
        std::fs::write(&self.path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }

    /// Default configuration destined for `path`
    pub fn create_default(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Config::default(),
        }
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigFileError> {
        toml::to_string_pretty(&self.config).map_err(|e| ConfigFileError::Serialize(e.to_string()))
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}
