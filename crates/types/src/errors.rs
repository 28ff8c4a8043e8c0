//! Error types for the message model

use thiserror::Error;

/// Result type alias for message model operations
pub type Result<T> = std::result::Result<T, TypesError>;

/// Errors raised while building or parsing messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("unknown level: {0}")]
    UnknownLevel(String),
}
