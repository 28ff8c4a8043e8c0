//! Integration tests for event stream assembly
//!
//! Test Coverage:
//! - Subscriber fan-out for both processing flavors
//! - Derived counter, percentile and rate streams
//! - Target routing with delivery receipts
//! - JSON ingestion into running processing

use async_trait::async_trait;
use logflow_types::{Level, Message, Units};
use processor::config::PipelineConfig;
use processor::events::{AckAware, Events, FireAndForget, Target, TargetRegistry};
use processor::ingest::{Ingest, JsonIngest};
use processor::pipeline::{cont, promise, Acknowledger, Cont, DeliveryReceipt};
use processor::Result;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time;

fn collector() -> (Cont<Message, ()>, UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = cont(move |message: Message| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(message);
            Ok(Some(()))
        }
    });
    (sink, rx)
}

fn drain(rx: &mut UnboundedReceiver<Message>) -> Vec<Message> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}

/// Target confirming delivery only when the test says so
#[derive(Debug)]
struct DeferredTarget {
    name: String,
    acks: UnboundedSender<(String, Acknowledger)>,
}

impl DeferredTarget {
    fn new(name: &str) -> (Self, UnboundedReceiver<(String, Acknowledger)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let target = Self {
            name: name.to_string(),
            acks: tx,
        };
        (target, rx)
    }
}

#[async_trait]
impl Target for DeferredTarget {
    fn name(&self) -> &str {
        &self.name
    }

    async fn log_with_ack(&self, message: Message) -> Result<DeliveryReceipt> {
        let (ack, receipt) = promise();
        let _ = self.acks.send((message.name.clone(), ack));
        Ok(receipt)
    }
}

// ============================================================================
// Fan-out
// ============================================================================

mod fanout_tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_sees_the_message() {
        let (sink, mut rx) = collector();
        let processing = FireAndForget::stream()
            .subscriber(Events::events().min_level(Level::Warn))
            .subscriber(Events::events().tag("audit"))
            .subscriber(Events::events().service("billing"))
            .to_processing(sink);

        let message = Message::event(Level::Error, "denied")
            .with_tag("audit")
            .with_service("api");
        assert_eq!(processing.call(message).await.unwrap(), Some(()));
        assert_eq!(drain(&mut rx).len(), 2);

        let quiet = Message::event(Level::Debug, "noise");
        assert_eq!(processing.call(quiet).await.unwrap(), None);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_merge_keeps_subscribers() {
        let left = FireAndForget::stream().subscriber(Events::events());
        let right = FireAndForget::stream()
            .subscribers([Events::events(), Events::events().tag("x")]);
        let merged = left.merge(right);
        assert_eq!(merged.len(), 3);

        let (sink, mut rx) = collector();
        let processing = merged.to_processing(sink);
        processing
            .call(Message::event(Level::Info, "once").with_tag("x"))
            .await
            .unwrap();
        assert_eq!(drain(&mut rx).len(), 3);
    }

    #[tokio::test]
    async fn test_empty_stream_absorbs_messages() {
        let (sink, mut rx) = collector();
        let processing = FireAndForget::stream().to_processing(sink);
        assert_eq!(
            processing.call(Message::event(Level::Info, "void")).await.unwrap(),
            None
        );
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_subscriber_batches_are_flattened() {
        let (sink, mut rx) = collector();
        let processing = FireAndForget::stream()
            .subscriber(Events::events().buffer(2).flatten())
            .to_processing(sink);

        processing.call(Message::event(Level::Info, "a")).await.unwrap();
        assert!(drain(&mut rx).is_empty());
        processing.call(Message::event(Level::Info, "b")).await.unwrap();

        let templates: Vec<String> = drain(&mut rx)
            .iter()
            .filter_map(|m| m.template().map(str::to_string))
            .collect();
        assert_eq!(templates.len(), 2);
        assert!(templates.contains(&"a".to_string()));
        assert!(templates.contains(&"b".to_string()));
    }
}

// ============================================================================
// Derived streams
// ============================================================================

mod derived_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_counter_emits_every_interval() {
        let (sink, mut rx) = collector();
        let processing = FireAndForget::stream()
            .subscriber(Events::events().counter("requests", Duration::from_secs(1)))
            .to_processing(sink);

        for _ in 0..4 {
            processing.call(Message::event(Level::Info, "hit")).await.unwrap();
        }
        time::sleep(Duration::from_millis(1500)).await;
        let first = drain(&mut rx);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "requests");
        assert_eq!(first[0].gauge_value(), Some(4.0));
        assert_eq!(
            first[0].value,
            logflow_types::Value::Gauge {
                value: 4.0,
                units: Units::Count
            }
        );

        time::sleep(Duration::from_secs(1)).await;
        let second = drain(&mut rx);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].gauge_value(), Some(0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_percentiles_of_gauges() {
        let (sink, mut rx) = collector();
        let processing = FireAndForget::stream()
            .subscriber(Events::events().percentiles("latency", Duration::from_secs(1)))
            .to_processing(sink);

        for value in 1..=100 {
            let gauge = Message::gauge("request_ms", value as f64, Units::Milliseconds);
            processing.call(gauge).await.unwrap();
        }
        processing.call(Message::event(Level::Info, "ignored")).await.unwrap();

        time::sleep(Duration::from_millis(1100)).await;
        let emitted = drain(&mut rx);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].gauge_value(), Some(50.5));
        assert_eq!(emitted[0].context["count"], 100);
        assert_eq!(emitted[0].context["min"], 1);
        assert_eq!(emitted[0].context["max"], 100);

        // Empty windows are skipped.
        time::sleep(Duration::from_secs(2)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_warms_up_then_rises() {
        let (sink, mut rx) = collector();
        let processing = FireAndForget::stream()
            .subscriber(Events::events().rate(
                "throughput",
                Duration::from_secs(1),
                Duration::from_secs(60),
            ))
            .to_processing(sink);

        for _ in 0..10 {
            processing.call(Message::event(Level::Info, "x")).await.unwrap();
        }
        time::sleep(Duration::from_millis(1100)).await;
        let warm_up = drain(&mut rx);
        assert_eq!(warm_up.len(), 1);
        assert_eq!(warm_up[0].gauge_value(), Some(0.0));

        for _ in 0..10 {
            processing.call(Message::event(Level::Info, "x")).await.unwrap();
        }
        time::sleep(Duration::from_secs(1)).await;
        let rate = drain(&mut rx)[0].gauge_value().unwrap();
        assert!(rate > 0.0 && rate < 10.0, "rate was {}", rate);
    }
}

// ============================================================================
// Ack-aware processing
// ============================================================================

mod ack_tests {
    use super::*;
    use processor::error::AckError;

    #[tokio::test]
    async fn test_receipt_resolves_when_every_target_confirms() {
        let (primary, mut primary_acks) = DeferredTarget::new("primary");
        let (replica, mut replica_acks) = DeferredTarget::new("replica");
        let registry = TargetRegistry::new().with_target(primary).with_target(replica);

        let processing = AckAware::stream()
            .subscriber(Events::events())
            .to_processing(registry.sink());

        let receipt = processing
            .call(Message::event(Level::Info, "durable").with_name("orders"))
            .await
            .unwrap()
            .expect("receipt");
        let waiter = tokio::spawn(receipt.delivered());

        let (name, ack) = primary_acks.recv().await.unwrap();
        assert_eq!(name, "orders");
        ack.ack();
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        replica_acks.recv().await.unwrap().1.ack();
        assert_eq!(waiter.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_routing_limits_targets() {
        let (primary, mut primary_acks) = DeferredTarget::new("primary");
        let (replica, mut replica_acks) = DeferredTarget::new("replica");
        let registry = TargetRegistry::new().with_target(primary).with_target(replica);

        let processing = AckAware::stream()
            .subscriber(Events::events().sink(["replica"]))
            .to_processing(registry.sink());

        let receipt = processing
            .call(Message::event(Level::Info, "routed"))
            .await
            .unwrap()
            .expect("receipt");
        replica_acks.recv().await.unwrap().1.ack();

        assert_eq!(receipt.delivered().await, Ok(()));
        assert!(primary_acks.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_confirmation_fails_receipt() {
        let (primary, mut primary_acks) = DeferredTarget::new("primary");
        let registry = TargetRegistry::new().with_target(primary);

        let processing = AckAware::stream()
            .subscriber(Events::events())
            .subscriber(Events::events().min_level(Level::Error))
            .to_processing(registry.sink());

        let receipt = processing
            .call(Message::event(Level::Error, "twice"))
            .await
            .unwrap()
            .expect("receipt");

        primary_acks.recv().await.unwrap().1.ack();
        primary_acks.recv().await.unwrap().1.fail("disk full");
        assert!(matches!(
            receipt.delivered().await,
            Err(AckError::Incomplete { failed: 1, .. })
        ));
    }
}

// ============================================================================
// Ingestion
// ============================================================================

mod ingest_tests {
    use super::*;

    #[tokio::test]
    async fn test_json_records_reach_subscribers() {
        let (sink, mut rx) = collector();
        let config = PipelineConfig::default();
        let processing = FireAndForget::stream()
            .subscriber(Events::events().min_level(Level::Warn))
            .to_processing_with(sink, &config);
        let ingest = JsonIngest::new(processing.inbox());

        ingest
            .ingest(br#"{"name": "api", "level": "error", "value": {"type": "event", "template": "boom"}}"#)
            .await
            .unwrap();
        ingest
            .ingest(br#"{"name": "api", "level": "info", "value": {"type": "event", "template": "fine"}}"#)
            .await
            .unwrap();

        let message = rx.recv().await.unwrap();
        assert_eq!(message.template(), Some("boom"));

        // Submissions are processed in order, so a call queued behind them
        // completes only after both records were handled.
        processing.call(Message::event(Level::Debug, "barrier")).await.unwrap();
        assert!(drain(&mut rx).is_empty());
    }
}
