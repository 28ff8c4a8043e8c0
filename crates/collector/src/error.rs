//! Collector error types

use std::net::SocketAddr;
use thiserror::Error;

/// Transport errors
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The configured endpoint could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Receiving failed for a reason other than shutdown
    #[error("receive failed: {0}")]
    Receive(#[source] std::io::Error),

    /// Invalid transport configuration
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, CollectorError>;
