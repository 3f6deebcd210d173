//! Configuration loading for the MISP CLI.

use anyhow::{Context, Result};
use misp_connector::{HostConfig, MispConfig};
use misp_observability::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// MISP connection settings.
    pub misp: MispConfig,

    /// Host platform API used by the lifecycle hooks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<HostConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Creates a copy with secrets redacted.
    pub fn redact_secrets(&self) -> Self {
        let mut config = self.clone();
        if !config.misp.api_key.is_empty() {
            config.misp.api_key = "***REDACTED***".into();
        }
        if let Some(token) = config.host.as_mut().and_then(|h| h.token.as_mut()) {
            *token = "***REDACTED***".into();
        }
        config
    }
}
