//! Configuration Module
//! Figure size and per-plot options, loadable from a JSON file. Missing
//! keys fall back to their defaults.

use crate::charts::{AdmixtureOptions, ManhattanOptions, QqOptions, VennOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Figure size must be positive, got {0}x{1}")]
    InvalidSize(u32, u32),
}

/// Reject figures with a zero width or height.
pub fn validate_size((width, height): (u32, u32)) -> Result<(), ConfigError> {
    if width == 0 || height == 0 {
        return Err(ConfigError::InvalidSize(width, height));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneviewConfig {
    pub width: u32,
    pub height: u32,
    pub manhattan: ManhattanOptions,
    pub qq: QqOptions,
    pub admixture: AdmixtureOptions,
    pub venn: VennOptions,
}

impl Default for GeneviewConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
            manhattan: ManhattanOptions::default(),
            qq: QqOptions::default(),
            admixture: AdmixtureOptions::default(),
            venn: VennOptions::default(),
        }
    }
}

impl GeneviewConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_size(self.size())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
