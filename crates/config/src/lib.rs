//! Configuration management for logflow
//!
//! Defaults are layered under an optional YAML file, which is layered under
//! `LOGFLOW_`-prefixed environment variables. Nested keys are separated by
//! `__`, e.g. `LOGFLOW_PIPELINE__FLUSH_INTERVAL_MS=500`.

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use logflow_collector::UdpIngestConfig;
use processor::config::{LoggingConfig, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main logflow configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LogflowConfig {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Pipeline defaults
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// UDP ingestion endpoint
    #[serde(default)]
    pub ingest: UdpIngestConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LogflowConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(LogflowConfig::default()));

        // Load from file if provided
        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        }

        // Override with environment variables (prefixed with LOGFLOW_)
        figment = figment.merge(Env::prefixed("LOGFLOW_").split("__"));

        Self::from_figment(figment)
    }

    /// Extract and validate configuration from any provider stack
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.service.name.trim().is_empty() {
            return Err(ConfigError::ValidationError("Service name required".to_string()));
        }

        self.pipeline
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        self.ingest
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        self.logging
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(())
    }
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Service name attached to emitted metrics
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "logflow".to_string(),
        }
    }
}
