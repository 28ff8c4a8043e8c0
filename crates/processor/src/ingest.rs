//! Ingestion contract between transports and the pipeline
//!
//! A transport calls [`Ingest::ingest`] once per inbound record. The call
//! returns as soon as the record has been handed to the root stage; it does
//! not wait for the record to travel through the pipeline.

use crate::error::Result;
use crate::pipeline::Inbox;
use async_trait::async_trait;
use logflow_types::Message;
use std::fmt;
use tracing::trace;

/// Entry point for raw records
#[async_trait]
pub trait Ingest: Send + Sync {
    async fn ingest(&self, raw: &[u8]) -> Result<()>;
}

/// Decodes JSON messages and submits them to a running pipeline
pub struct JsonIngest<R> {
    inbox: Inbox<Message, R>,
}

impl<R> fmt::Debug for JsonIngest<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonIngest")
            .field("inbox", &self.inbox)
            .finish()
    }
}

impl<R: Send + 'static> JsonIngest<R> {
    pub fn new(inbox: Inbox<Message, R>) -> Self {
        Self { inbox }
    }

    /// Parse one record
    pub fn decode(raw: &[u8]) -> Result<Message> {
        Ok(serde_json::from_slice(raw)?)
    }
}

#[async_trait]
impl<R: Send + 'static> Ingest for JsonIngest<R> {
    async fn ingest(&self, raw: &[u8]) -> Result<()> {
        let message = Self::decode(raw)?;
        trace!(logger = %message.name, level = %message.level, "record decoded");
        self.inbox.submit(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessorError;
    use crate::pipeline::{cont, Pipe};
    use logflow_types::Level;
    use tokio::sync::mpsc;

    #[test]
    fn test_decode_applies_defaults() {
        let message =
            JsonIngest::<()>::decode(br#"{"value": {"type": "event", "template": "hi"}}"#).unwrap();
        assert_eq!(message.level, Level::Info);
        assert_eq!(message.template(), Some("hi"));
        assert!(message.context.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_submits_to_pipeline() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let running = Pipe::<Message, (), Message>::start().run(cont(move |message: Message| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(message);
                Ok(Some(()))
            }
        }));
        let ingest = JsonIngest::new(running.inbox());

        ingest
            .ingest(br#"{"name": "api", "level": "warn", "value": {"type": "gauge", "value": 3.0, "units": "count"}}"#)
            .await
            .unwrap();

        let message = rx.recv().await.unwrap();
        assert_eq!(message.name, "api");
        assert_eq!(message.level, Level::Warn);
        assert_eq!(message.gauge_value(), Some(3.0));
    }

    #[tokio::test]
    async fn test_ingest_rejects_garbage() {
        let running = Pipe::<Message, (), Message>::start().run(cont(|_message: Message| async {
            Ok(Some(()))
        }));
        let ingest = JsonIngest::new(running.inbox());

        let err = ingest.ingest(b"not json").await.unwrap_err();
        assert!(matches!(err, ProcessorError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_ingest_outlives_running_handle() {
        let running = Pipe::<Message, (), Message>::start().run(cont(|_message: Message| async {
            Ok(Some(()))
        }));
        let ingest = JsonIngest::new(running.inbox());
        drop(running);
        // The ingest handle still holds the inbox, so the root loop stays alive.
        assert!(ingest
            .ingest(br#"{"value": {"type": "event", "template": "late"}}"#)
            .await
            .is_ok());
    }
}
