//! Log Collector
//!
//! This crate provides the UDP transport that feeds records into a logflow
//! pipeline through the [`processor::ingest::Ingest`] contract. It binds a
//! configured endpoint, ingests one record per datagram, counts received,
//! ingested and rejected records, and stops cleanly on cancellation.

pub mod config;
pub mod error;
pub mod udp;

pub use config::{UdpIngestConfig, MAX_UDP_PAYLOAD};
pub use error::{CollectorError, Result};
pub use udp::{
    classify_receive_error, IngestStats, ReceiveFault, StatsHandle, Termination, UdpIngestServer,
};
