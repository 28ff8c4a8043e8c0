//! Shared helpers for collector integration tests

use async_trait::async_trait;
use processor::ingest::Ingest;
use processor::ProcessorError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;

/// Ingest that forwards raw records to a channel, rejecting empty ones
pub struct RecordingIngest {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl RecordingIngest {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Ingest for RecordingIngest {
    async fn ingest(&self, raw: &[u8]) -> processor::Result<()> {
        if raw.is_empty() {
            return Err(ProcessorError::Unexpected("empty record".to_string()));
        }
        let _ = self.tx.send(raw.to_vec());
        Ok(())
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_for_condition<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
