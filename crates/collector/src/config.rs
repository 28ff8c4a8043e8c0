//! UDP transport configuration

use crate::error::{CollectorError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Largest payload a UDP datagram can carry over IPv4
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// UDP ingestion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UdpIngestConfig {
    /// Address to bind
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Datagrams larger than this are rejected
    #[serde(default = "default_max_datagram_bytes")]
    pub max_datagram_bytes: usize,
}

impl Default for UdpIngestConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_datagram_bytes: default_max_datagram_bytes(),
        }
    }
}

impl UdpIngestConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            ..Default::default()
        }
    }

    pub fn with_max_datagram_bytes(mut self, bytes: usize) -> Self {
        self.max_datagram_bytes = bytes;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_datagram_bytes == 0 {
            return Err(CollectorError::Configuration(
                "max_datagram_bytes must be greater than 0".to_string(),
            ));
        }
        if self.max_datagram_bytes > MAX_UDP_PAYLOAD {
            return Err(CollectorError::Configuration(format!(
                "max_datagram_bytes must not exceed {}",
                MAX_UDP_PAYLOAD
            )));
        }
        Ok(())
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8126))
}

fn default_max_datagram_bytes() -> usize {
    MAX_UDP_PAYLOAD
}
