//! Configuration types for the stream processor
//!
//! This module provides configuration structures for pipeline defaults and
//! for the tracing subscriber.

use crate::error::{ProcessorError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pipeline defaults used by the derived streams
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Flush interval of time-based buffers (milliseconds)
    #[serde(default = "default_flush_interval")]
    pub flush_interval_ms: u64,

    /// Interval at which rate streams emit (milliseconds)
    #[serde(default = "default_rate_interval")]
    pub rate_interval_ms: u64,

    /// EWMA smoothing period (milliseconds)
    #[serde(default = "default_alpha_period")]
    pub alpha_period_ms: u64,

    /// Time unit rates are reported in (milliseconds)
    #[serde(default = "default_rate_unit")]
    pub rate_unit_ms: u64,

    /// Interval at which percentile streams emit (milliseconds)
    #[serde(default = "default_percentile_interval")]
    pub percentile_interval_ms: u64,

    /// Capacity of the ingestion hand-off queue
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: default_flush_interval(),
            rate_interval_ms: default_rate_interval(),
            alpha_period_ms: default_alpha_period(),
            rate_unit_ms: default_rate_unit(),
            percentile_interval_ms: default_percentile_interval(),
            inbox_capacity: default_inbox_capacity(),
        }
    }
}

impl PipelineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("flush_interval_ms", self.flush_interval_ms),
            ("rate_interval_ms", self.rate_interval_ms),
            ("alpha_period_ms", self.alpha_period_ms),
            ("rate_unit_ms", self.rate_unit_ms),
            ("percentile_interval_ms", self.percentile_interval_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ProcessorError::Configuration {
                    source: format!("pipeline {} must be greater than 0", name).into(),
                });
            }
        }

        if self.inbox_capacity == 0 {
            return Err(ProcessorError::Configuration {
                source: "pipeline inbox_capacity must be greater than 0".into(),
            });
        }

        Ok(())
    }

    /// Get flush interval as Duration
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Get rate interval as Duration
    pub fn rate_interval(&self) -> Duration {
        Duration::from_millis(self.rate_interval_ms)
    }

    /// Get alpha period as Duration
    pub fn alpha_period(&self) -> Duration {
        Duration::from_millis(self.alpha_period_ms)
    }

    /// Get rate unit as Duration
    pub fn rate_unit(&self) -> Duration {
        Duration::from_millis(self.rate_unit_ms)
    }

    /// Get percentile interval as Duration
    pub fn percentile_interval(&self) -> Duration {
        Duration::from_millis(self.percentile_interval_ms)
    }
}

/// Tracing subscriber configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.filter.trim().is_empty() {
            return Err(ProcessorError::Configuration {
                source: "logging filter must not be empty".into(),
            });
        }
        Ok(())
    }
}

fn default_flush_interval() -> u64 {
    1_000
}

fn default_rate_interval() -> u64 {
    5_000
}

fn default_alpha_period() -> u64 {
    60_000
}

fn default_rate_unit() -> u64 {
    1_000
}

fn default_percentile_interval() -> u64 {
    10_000
}

fn default_inbox_capacity() -> usize {
    1_024
}

fn default_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pipeline_config() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.flush_interval(), Duration::from_secs(1));
        assert_eq!(config.alpha_period(), Duration::from_secs(60));
        assert_eq!(config.rate_unit(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = PipelineConfig {
            rate_interval_ms: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("rate_interval_ms"));
    }

    #[test]
    fn test_zero_inbox_capacity_rejected() {
        let config = PipelineConfig {
            inbox_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{"flush_interval_ms": 250}"#).unwrap();
        assert_eq!(config.flush_interval(), Duration::from_millis(250));
        assert_eq!(config.percentile_interval_ms, 10_000);
    }

    #[test]
    fn test_logging_config() {
        assert!(LoggingConfig::default().validate().is_ok());

        let config = LoggingConfig {
            filter: "  ".to_string(),
            json: true,
        };
        assert!(config.validate().is_err());
    }
}
