//! Tracing subscriber setup
//!
//! Installs a global `tracing` subscriber made of an [`EnvFilter`] and a fmt
//! layer. `RUST_LOG` takes precedence over the configured directive.

use crate::config::LoggingConfig;
use crate::error::{ProcessorError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber described by `config`
///
/// # Errors
///
/// Fails on an invalid filter directive or when a global subscriber is
/// already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    config.validate()?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => directive_filter(&config.filter)?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    installed.map_err(|e| ProcessorError::Configuration {
        source: Box::new(e),
    })
}

fn directive_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive).map_err(|e| ProcessorError::Configuration {
        source: Box::new(e),
    })
}
