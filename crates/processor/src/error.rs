//! Error types for the stream processor
//!
//! This module provides error handling for every processor operation:
//! snapshot statistics, stage hand-off, tick triggers, delivery
//! acknowledgements and targets.

use thiserror::Error;

/// Main processor error type
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// Aggregation-related errors
    #[error("aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    /// Stage hand-off and tick trigger errors
    #[error("pipe error: {0}")]
    Pipe(#[from] PipeError),

    /// Delivery acknowledgement errors
    #[error("acknowledgement error: {0}")]
    Ack(#[from] AckError),

    /// A target failed to accept a message
    #[error("target '{target}' failed: {source}")]
    Target {
        target: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors
    #[error("configuration error: {source}")]
    Configuration {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for unexpected conditions
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ProcessorError {
    /// Wrap a target failure
    pub fn target<E>(target: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        ProcessorError::Target {
            target: target.into(),
            source: source.into(),
        }
    }
}

/// Statistics computation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    /// Argument outside its valid domain
    #[error("invalid argument {name}={value}: {reason}")]
    InvalidArgument {
        name: &'static str,
        value: f64,
        reason: String,
    },
}

/// Stage hand-off errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipeError {
    /// The consumer loop of a stage has stopped
    #[error("stage '{stage}' is closed")]
    StageClosed { stage: String },

    /// The stage dropped the reply handle without answering
    #[error("stage '{stage}' dropped the reply")]
    ReplyDropped { stage: String },

    /// The consumer of a tick trigger has stopped
    #[error("tick trigger for '{ticker}' is closed")]
    TriggerClosed { ticker: String },
}

/// Delivery acknowledgement errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AckError {
    /// The target dropped its promise without fulfilling it
    #[error("acknowledgement dropped before delivery was confirmed")]
    Dropped,

    /// The target reported that delivery failed
    #[error("delivery failed: {reason}")]
    Failed { reason: String },

    /// Some members of a combined acknowledgement failed
    #[error("{failed} of {total} acknowledgements failed")]
    Incomplete { failed: usize, total: usize },

    /// The owner gave up waiting
    #[error("acknowledgement not received within {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },
}

/// Result type alias for processor operations
pub type Result<T> = std::result::Result<T, ProcessorError>;

/// Result type alias for aggregation operations
pub type AggregationResult<T> = std::result::Result<T, AggregationError>;

/// Result type alias for acknowledgement waits
pub type AckResult<T> = std::result::Result<T, AckError>;

impl From<serde_json::Error> for ProcessorError {
    fn from(err: serde_json::Error) -> Self {
        ProcessorError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for ProcessorError {
    fn from(err: anyhow::Error) -> Self {
        ProcessorError::Unexpected(err.to_string())
    }
}
