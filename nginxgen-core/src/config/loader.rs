//! Configuration loader

use crate::config::DeployConfig;
use crate::error::{Error, Result};
use std::path::Path;

/// Configuration loader for deployment descriptors
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a deployment descriptor from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DeployConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config = match ext {
            "json" => Self::from_json(&content)?,
            "toml" => Self::from_toml(&content)?,
            _ => return Err(Error::Config(format!("Unknown config format: {}", ext))),
        };

        tracing::debug!("Loaded {} site(s) from {}", config.sites.len(), path.display());
        Ok(config)
    }

    /// Parse JSON configuration
    pub fn from_json(content: &str) -> Result<DeployConfig> {
        serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid JSON: {}", e)))
    }

    /// Parse TOML configuration
    pub fn from_toml(content: &str) -> Result<DeployConfig> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }
}
