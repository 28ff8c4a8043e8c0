//! Core types for the logflow pipeline
//!
//! This crate provides the message model shared by the processor, the
//! ingestion transports and the targets.

pub mod errors;
pub mod level;
pub mod message;

pub use errors::{Result, TypesError};
pub use level::Level;
pub use message::{Message, Units, Value, SERVICE_KEY, SINKS_KEY};
