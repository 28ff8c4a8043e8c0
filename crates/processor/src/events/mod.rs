//! Message streams and their assembly into running processing
//!
//! An [`Events`] stream is a list of subscriber pipes. Each subscriber is
//! built independently against the same terminal sink and every incoming
//! message is handed to all of them concurrently.
//!
//! The result type picks the flavor:
//! - [`FireAndForget`] streams end in sinks returning `()`
//! - [`AckAware`] streams end in sinks returning a [`DeliveryReceipt`]; the
//!   receipts of all subscribers are joined into one
//!
//! Subscribers that batch messages (`buffer`, `buffer_time`) are turned back
//! into message pipes with [`Pipe::flatten`], which dispatches the members of
//! a batch concurrently and joins their results.
//!
//! # Example
//!
//! ```rust,no_run
//! use logflow_types::Level;
//! use processor::events::{Events, FireAndForget, TargetRegistry, TracingTarget};
//! use std::time::Duration;
//!
//! # async fn example() -> processor::Result<()> {
//! let mut targets = TargetRegistry::new();
//! targets.register(TracingTarget::new("console"));
//!
//! let processing = FireAndForget::stream()
//!     .subscriber(Events::events().min_level(Level::Warn))
//!     .subscriber(Events::events().counter("messages", Duration::from_secs(10)))
//!     .to_processing(targets.fire_and_forget_sink());
//!
//! processing.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod filters;
pub mod target;

pub use filters::percentile_message;
pub use target::{Target, TargetRegistry, TracingTarget};

use crate::config::PipelineConfig;
use crate::pipeline::{Cont, DeliveryReceipt, Fanout, Pipe, RunningPipe};
use logflow_types::Message;
use std::fmt;
use tracing::info;

/// A message pipe fed by the events source
pub type MessagePipe<R> = Pipe<Message, R, Message>;

/// Running processing of a message stream
pub type Processing<R> = RunningPipe<Message, R>;

/// Streams whose sinks do not confirm delivery
pub type FireAndForget = Events<()>;

/// Streams whose sinks confirm delivery
pub type AckAware = Events<DeliveryReceipt>;

/// Ordered list of independently built subscriber pipes
pub struct Events<R> {
    subscribers: Vec<MessagePipe<R>>,
}

impl<R> fmt::Debug for Events<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<R: Fanout> Default for Events<R> {
    fn default() -> Self {
        Self::stream()
    }
}

impl<R: Fanout> Events<R> {
    /// An empty stream
    pub fn stream() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// The source pipe every subscriber starts from
    pub fn events() -> MessagePipe<R> {
        Pipe::start()
    }

    pub fn subscriber(mut self, pipe: MessagePipe<R>) -> Self {
        self.subscribers.push(pipe);
        self
    }

    pub fn subscribers<I>(mut self, pipes: I) -> Self
    where
        I: IntoIterator<Item = MessagePipe<R>>,
    {
        self.subscribers.extend(pipes);
        self
    }

    /// Append the subscribers of `other`, keeping their order
    pub fn merge(mut self, other: Events<R>) -> Self {
        self.subscribers.extend(other.subscribers);
        self
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Build every subscriber against `sink` and start their tick jobs
    pub fn to_processing(self, sink: Cont<Message, R>) -> Processing<R> {
        info!(subscribers = self.subscribers.len(), "starting event processing");
        Pipe::merge(self.subscribers).run(sink)
    }

    /// Like [`Events::to_processing`], sizing the root inbox from `config`
    pub fn to_processing_with(self, sink: Cont<Message, R>, config: &PipelineConfig) -> Processing<R> {
        info!(
            subscribers = self.subscribers.len(),
            inbox_capacity = config.inbox_capacity,
            "starting event processing"
        );
        Pipe::merge(self.subscribers).run_with_capacity(sink, config.inbox_capacity)
    }
}
