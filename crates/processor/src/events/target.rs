//! Output targets and message routing

use crate::error::{AckError, Result};
use crate::pipeline::ack::gather;
use crate::pipeline::{cont, AckHandle, Cont, DeliveryReceipt};
use async_trait::async_trait;
use futures::future::join_all;
use logflow_types::{Level, Message, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// A destination for messages
///
/// Targets that confirm delivery asynchronously return a pending receipt
/// (see [`crate::pipeline::promise`]); the others return
/// [`DeliveryReceipt::Immediate`].
#[async_trait]
pub trait Target: Send + Sync + fmt::Debug {
    /// Name messages use to route to this target
    fn name(&self) -> &str;

    /// Accept a message and report how its delivery will be confirmed
    async fn log_with_ack(&self, message: Message) -> Result<DeliveryReceipt>;

    /// Accept a message without tracking its delivery
    async fn log(&self, message: Message) -> Result<()> {
        self.log_with_ack(message).await.map(|_| ())
    }
}

/// The set of targets messages are routed to
///
/// A message naming sinks (see [`Message::with_sinks`]) goes to those
/// targets only; any other message goes to every target. A message whose
/// named sinks are all unknown is not delivered anywhere and its receipt
/// fails.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: Vec<Arc<dyn Target>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Target + 'static>(&mut self, target: T) {
        self.register_shared(Arc::new(target));
    }

    pub fn register_shared(&mut self, target: Arc<dyn Target>) {
        debug!(target_name = target.name(), "target registered");
        self.targets.push(target);
    }

    pub fn with_target<T: Target + 'static>(mut self, target: T) -> Self {
        self.register(target);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.targets.iter().map(|target| target.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    fn route(&self, message: &Message) -> Vec<Arc<dyn Target>> {
        let names = message.sinks();
        if names.is_empty() {
            return self.targets.clone();
        }

        let mut routed = Vec::with_capacity(names.len());
        for name in names {
            match self.targets.iter().find(|target| target.name() == name) {
                Some(target) => routed.push(target.clone()),
                None => warn!(target_name = name, logger = %message.name, "unknown target"),
            }
        }
        routed
    }

    /// Hand the message to its targets concurrently and join their receipts
    ///
    /// Every target is awaited even when one fails; the first failure is
    /// returned.
    pub async fn dispatch(&self, message: Message) -> Result<DeliveryReceipt> {
        let routed = self.route(&message);
        if routed.is_empty() && !message.sinks().is_empty() {
            let reason = format!("no known target among sinks [{}]", message.sinks().join(", "));
            warn!(logger = %message.name, reason = %reason, "message undeliverable");
            return Ok(DeliveryReceipt::Pending(AckHandle::failed(AckError::Failed { reason })));
        }

        let results = join_all(
            routed
                .iter()
                .map(|target| target.log_with_ack(message.clone())),
        )
        .await;

        let receipts = results.into_iter().map(|result| result.map(Some)).collect();
        Ok(gather("targets", receipts)?.unwrap_or(DeliveryReceipt::Immediate))
    }

    /// Terminal continuation for ack-aware streams
    pub fn sink(&self) -> Cont<Message, DeliveryReceipt> {
        let registry = self.clone();
        cont(move |message: Message| {
            let registry = registry.clone();
            async move { registry.dispatch(message).await.map(Some) }
        })
    }

    /// Terminal continuation for fire-and-forget streams
    ///
    /// Pending receipts are dropped without waiting for them.
    pub fn fire_and_forget_sink(&self) -> Cont<Message, ()> {
        let registry = self.clone();
        cont(move |message: Message| {
            let registry = registry.clone();
            async move {
                registry.dispatch(message).await?;
                Ok(Some(()))
            }
        })
    }
}

/// Writes messages to the `tracing` subscriber
#[derive(Debug, Clone)]
pub struct TracingTarget {
    name: String,
}

impl TracingTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

macro_rules! log_at {
    ($level:expr, $($field:tt)+) => {
        match $level {
            Level::Verbose => trace!($($field)+),
            Level::Debug => debug!($($field)+),
            Level::Info => info!($($field)+),
            Level::Warn => warn!($($field)+),
            Level::Error | Level::Fatal => error!($($field)+),
        }
    };
}

#[async_trait]
impl Target for TracingTarget {
    fn name(&self) -> &str {
        &self.name
    }

    async fn log_with_ack(&self, message: Message) -> Result<DeliveryReceipt> {
        let context = serde_json::to_string(&message.context)?;
        match &message.value {
            Value::Event { template } => log_at!(
                message.level,
                target: "logflow",
                logger = %message.name,
                context = %context,
                "{}",
                template
            ),
            Value::Gauge { value, units } => log_at!(
                message.level,
                target: "logflow",
                gauge = %message.name,
                value = *value,
                units = ?units,
                context = %context,
                "gauge"
            ),
        }
        Ok(DeliveryReceipt::Immediate)
    }
}
