//! Stream processor for logflow
//!
//! This crate provides the stream-processing core of the pipeline: composable
//! pipes, periodic tickers, EWMA rates and percentile snapshots, plus the
//! events DSL that wires message streams to output targets.

pub mod aggregation;
pub mod config;
pub mod error;
pub mod events;
pub mod ingest;
pub mod pipeline;
pub mod telemetry;
pub mod ticker;

// Re-export commonly used types
pub use aggregation::{alpha, EwmaState, Snapshot};

pub use error::{AckError, AggregationError, PipeError, ProcessorError, Result};

pub use config::{LoggingConfig, PipelineConfig};

pub use pipeline::{
    cont, promise, AckHandle, Acknowledger, Cont, DeliveryReceipt, Fanout, Inbox, Pipe,
    RunningPipe, SlidingWindow,
};

pub use ticker::{
    trigger, BufferTicker, Cancellation, CountTicker, EwmaTicker, SnapshotTicker, TickJob,
    TickTrigger, Ticker, Ticks, MIN_TICK_INTERVAL,
};

pub use events::{
    AckAware, Events, FireAndForget, MessagePipe, Processing, Target, TargetRegistry,
    TracingTarget,
};

pub use ingest::{Ingest, JsonIngest};

pub use telemetry::init_tracing;
