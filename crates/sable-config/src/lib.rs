//! Engine configuration and tracing setup.
//!
//! Configuration is TOML; every table and key is optional and falls back to
//! its default. Unknown keys are tolerated and reported so typos do not go
//! unnoticed.

mod logging;

pub use logging::{init_tracing, LoggingConfig};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` embeds a source snippet; keep only the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Persist analysis results between runs.
    pub enabled: bool,
    /// Overrides `SABLE_CACHE_DIR` and the home-directory default.
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Size of the analysis pool; `0` picks a default from the CPU count.
    pub compute_threads: usize,
    /// Skip files whose fingerprint matches the last completed analysis.
    pub skip_unchanged_files: bool,
    /// Files larger than this are indexed from syntax only, without
    /// attribution.
    pub max_file_bytes: u64,
}

impl IndexingConfig {
    pub const DEFAULT_MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            compute_threads: 0,
            skip_unchanged_files: true,
            max_file_bytes: Self::DEFAULT_MAX_FILE_BYTES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub logging: LoggingConfig,
    pub cache: CacheConfig,
    pub indexing: IndexingConfig,
}

impl EngineConfig {
    /// Loads a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(target: "sable.config", path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parses TOML text, logging every key that was ignored.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let (config, unknown_keys) = Self::from_toml_str_with_unknown_keys(text)?;
        for key in &unknown_keys {
            tracing::warn!(target: "sable.config", key = %key, "ignoring unknown config key");
        }
        Ok(config)
    }

    /// Parses TOML text and returns the dotted paths of keys that were ignored.
    pub fn from_toml_str_with_unknown_keys(text: &str) -> Result<(Self, Vec<String>)> {
        Ok(deserialize_with_unknown_keys(text)?)
    }
}

fn deserialize_with_unknown_keys<T: DeserializeOwned>(
    text: &str,
) -> std::result::Result<(T, Vec<String>), toml::de::Error> {
    let mut unknown = Vec::<String>::new();
    let deserializer = toml::de::Deserializer::new(text);
    let value = serde_ignored::deserialize(deserializer, |path| {
        unknown.push(path.to_string().trim_start_matches('.').to_owned());
    })?;
    unknown.sort();
    unknown.dedup();
    Ok((value, unknown))
}
