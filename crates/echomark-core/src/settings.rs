//! TOML settings for the command-line tools
//!
//! Selects where the index lives and how it is encoded, and carries the
//! fingerprint and matching parameters. Every table and field is optional.

use crate::config::{FingerprintConfig, MatchingConfig};
use crate::error::{EchomarkError, Result};
use echomark_index::Encoding;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EchomarkSettings {
    #[serde(default)]
    pub index: IndexStorageConfig,
    #[serde(default)]
    pub fingerprint: FingerprintConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
}

/// Index file location and encoding
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexStorageConfig {
    #[serde(default = "default_index_path")]
    pub path: String,
    #[serde(default)]
    pub format: IndexFormat,
    #[serde(default = "default_compress")]
    pub compress: bool,
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

impl Default for IndexStorageConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            format: IndexFormat::default(),
            compress: default_compress(),
            compression_level: default_compression_level(),
        }
    }
}

fn default_index_path() -> String {
    "./echomark.idx".to_string()
}
fn default_compress() -> bool {
    true
}
fn default_compression_level() -> i32 {
    3
}

/// On-disk encoding of the index
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexFormat {
    #[default]
    Binary,
    Json,
}

impl IndexStorageConfig {
    pub fn encoding(&self) -> Encoding {
        match self.format {
            IndexFormat::Binary => Encoding::Binary {
                compress: self.compress,
            },
            IndexFormat::Json => Encoding::Json,
        }
    }
}

impl EchomarkSettings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: EchomarkSettings = toml::from_str(&content).map_err(|e| {
            EchomarkError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path` if given, otherwise from `./echomark.toml`
    /// when present, otherwise defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new("echomark.toml");
                if fallback.exists() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.fingerprint.validate()?;
        self.matching.validate()
    }
}
