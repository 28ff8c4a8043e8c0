//! UDP ingestion server
//!
//! Every datagram is one record handed to an [`Ingest`] implementation. A
//! record that fails to ingest is logged and counted; it never stops the
//! server.

use crate::config::UdpIngestConfig;
use crate::error::{CollectorError, Result};
use processor::ingest::Ingest;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why the receive loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The cancellation token was triggered
    Cancelled,
    /// The socket went away while a receive was in flight
    SocketClosed,
}

/// How a receive error is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveFault {
    /// Clean termination
    SocketClosed,
    /// Skip and keep receiving
    Transient,
    /// Stop with an error
    Fatal,
}

/// Classify a receive error
///
/// Once shutdown has been requested every error counts as a closed socket.
pub fn classify_receive_error(err: &io::Error, shutting_down: bool) -> ReceiveFault {
    if shutting_down {
        return ReceiveFault::SocketClosed;
    }
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe => ReceiveFault::SocketClosed,
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => ReceiveFault::Transient,
        _ => ReceiveFault::Fatal,
    }
}

/// Point-in-time copy of the server counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Datagrams received
    pub received: u64,
    /// Records handed to the pipeline
    pub ingested: u64,
    /// Records rejected (oversized or failed to ingest)
    pub rejected: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    ingested: AtomicU64,
    rejected: AtomicU64,
}

/// Handle for reading the counters of a running server
#[derive(Debug, Clone)]
pub struct StatsHandle {
    counters: Arc<Counters>,
}

impl StatsHandle {
    pub fn snapshot(&self) -> IngestStats {
        IngestStats {
            received: self.counters.received.load(Ordering::Relaxed),
            ingested: self.counters.ingested.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Receives datagrams on a bound socket and ingests them
pub struct UdpIngestServer<I> {
    config: UdpIngestConfig,
    socket: UdpSocket,
    local_addr: SocketAddr,
    ingest: I,
    counters: Arc<Counters>,
}

impl<I: Ingest> UdpIngestServer<I> {
    /// Validate `config` and bind its endpoint
    pub async fn bind(config: UdpIngestConfig, ingest: I) -> Result<Self> {
        config.validate()?;

        let socket = UdpSocket::bind(config.bind)
            .await
            .map_err(|source| CollectorError::Bind {
                addr: config.bind,
                source,
            })?;
        let local_addr = socket.local_addr().map_err(|source| CollectorError::Bind {
            addr: config.bind,
            source,
        })?;
        info!(addr = %local_addr, "udp ingest bound");

        Ok(Self {
            config,
            socket,
            local_addr,
            ingest,
            counters: Arc::new(Counters::default()),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> StatsHandle {
        StatsHandle {
            counters: self.counters.clone(),
        }
    }

    /// Receive until `cancel` fires or the socket closes
    ///
    /// # Errors
    ///
    /// [`CollectorError::Receive`] for receive faults that are neither
    /// transient nor caused by shutdown.
    pub async fn run(self, cancel: CancellationToken) -> Result<Termination> {
        // One spare byte tells oversized datagrams apart from full-sized ones.
        let mut buf = vec![0u8; self.config.max_datagram_bytes + 1];
        info!(addr = %self.local_addr, "udp ingest started");

        let termination = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Termination::Cancelled,
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, peer)) => self.handle(&buf[..len], peer).await,
                    Err(e) => match classify_receive_error(&e, cancel.is_cancelled()) {
                        ReceiveFault::SocketClosed => {
                            debug!(error = %e, "socket closed during receive");
                            break Termination::SocketClosed;
                        }
                        ReceiveFault::Transient => {
                            debug!(error = %e, "transient receive error");
                        }
                        ReceiveFault::Fatal => {
                            error!(addr = %self.local_addr, error = %e, "udp receive failed");
                            return Err(CollectorError::Receive(e));
                        }
                    },
                },
            }
        };

        let stats = self.stats().snapshot();
        info!(
            addr = %self.local_addr,
            termination = ?termination,
            received = stats.received,
            ingested = stats.ingested,
            rejected = stats.rejected,
            "udp ingest stopped"
        );
        Ok(termination)
    }

    async fn handle(&self, datagram: &[u8], peer: SocketAddr) {
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        if datagram.len() > self.config.max_datagram_bytes {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(
                peer = %peer,
                max_bytes = self.config.max_datagram_bytes,
                "oversized datagram dropped"
            );
            return;
        }

        match self.ingest.ingest(datagram).await {
            Ok(()) => {
                self.counters.ingested.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(peer = %peer, bytes = datagram.len(), error = %e, "record rejected");
            }
        }
    }
}
