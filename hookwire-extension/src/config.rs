//! Environment configuration, read from TOML.
//!
//! ```toml
//! name = "network-service"
//!
//! [database]
//! retry_tx_count = 3
//! retry_tx_interval_ms = 200
//!
//! [[extensions]]
//! id = "network-quota"
//! code_type = "native"
//! url = "file://network_quota"
//! path = "^/v2.0/networks"
//! ```

use hookwire_storage::DbOptions;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid path pattern for extension '{id}': {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: regex::Error,
    },
}

fn default_name() -> String {
    "default".to_string()
}

fn default_code_type() -> String {
    crate::CODE_TYPE.to_string()
}

/// Top-level environment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub extensions: Vec<ExtensionConfig>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            database: DatabaseConfig::default(),
            extensions: Vec::new(),
        }
    }
}

impl EnvironmentConfig {
    /// Reads configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("No config file found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        info!("Loaded environment config from {:?}", path);
        Ok(config)
    }

    /// Parses configuration text and validates extension path patterns.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        for extension in &config.extensions {
            extension.pattern()?;
        }
        Ok(config)
    }
}

/// `[database]` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub retry_tx_count: u32,
    #[serde(default)]
    pub retry_tx_interval_ms: u64,
}

impl DatabaseConfig {
    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            retry_tx_count: self.retry_tx_count,
            retry_tx_interval: Duration::from_millis(self.retry_tx_interval_ms),
        }
    }
}

/// One `[[extensions]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    pub id: String,
    #[serde(default = "default_code_type")]
    pub code_type: String,
    #[serde(default)]
    pub url: String,
    /// Regex over request paths; empty matches every path.
    #[serde(default)]
    pub path: String,
}

impl ExtensionConfig {
    pub fn new(id: &str, url: &str, path: &str) -> Self {
        Self {
            id: id.into(),
            code_type: default_code_type(),
            url: url.into(),
            path: path.into(),
        }
    }

    fn pattern(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.path).map_err(|source| ConfigError::InvalidPattern {
            id: self.id.clone(),
            source,
        })
    }

    /// Whether this extension applies to `path`.
    pub fn matches(&self, path: &str) -> bool {
        match self.pattern() {
            Ok(pattern) => pattern.is_match(path),
            Err(err) => {
                warn!(extension_id = %self.id, error = %err, "skipping extension");
                false
            }
        }
    }
}
