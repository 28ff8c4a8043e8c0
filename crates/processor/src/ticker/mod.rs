//! Periodic fold-and-emit stages
//!
//! A [`Ticker`] folds incoming items into a private state and, every time its
//! trigger fires, turns that state into an output which is forwarded
//! downstream. The fold and the tick are both executed by the single consumer
//! loop that [`crate::pipeline::Pipe::tick`] spawns, so ticker state never
//! needs synchronization.
//!
//! The trigger side is a [`TickTrigger`]. It can be fired by hand with
//! [`TickTrigger::tick`] or periodically with [`TickTrigger::tick_every`],
//! which returns the [`Cancellation`] that stops the background loop.
//!
//! # Example
//!
//! ```rust,no_run
//! use processor::ticker::{trigger, BufferTicker};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let (trigger, _ticks) = trigger("flush");
//! let cancellation = trigger.tick_every(Duration::from_secs(1));
//! // ...
//! cancellation.signal();
//! # }
//! ```

pub mod buffer;
pub mod count;
pub mod ewma;
pub mod snapshot;

pub use buffer::BufferTicker;
pub use count::CountTicker;
pub use ewma::EwmaTicker;
pub use snapshot::SnapshotTicker;

use crate::error::{PipeError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Fold items into a state and emit a result on every tick
pub trait Ticker: Send + 'static {
    type State: Send + 'static;
    type Item: Send + 'static;
    type Output: Send + 'static;

    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// State before the first item
    fn initial(&self) -> Self::State;

    /// Fold one item into the state
    fn fold(&self, state: Self::State, item: Self::Item) -> Self::State;

    /// Produce the tick output and the state to continue with
    fn handle_tick(&self, state: Self::State) -> (Self::State, Self::Output);
}

/// One-shot stop request for a background loop
///
/// Signaling is idempotent; every clone observes the same signal.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) {
        self.token.cancel();
    }

    pub fn is_signaled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once [`Cancellation::signal`] has been called
    pub async fn signaled(&self) {
        self.token.cancelled().await
    }
}

/// A pending tick; the consumer completes it once the tick has been handled
#[derive(Debug)]
pub struct TickSignal {
    done: oneshot::Sender<()>,
}

impl TickSignal {
    pub fn complete(self) {
        let _ = self.done.send(());
    }
}

/// Shortest period a tick loop runs with
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Sending side of a ticker's tick channel
#[derive(Debug, Clone)]
pub struct TickTrigger {
    name: Arc<str>,
    tx: mpsc::Sender<TickSignal>,
}

/// Receiving side of a ticker's tick channel, owned by the consumer loop
#[derive(Debug)]
pub struct Ticks {
    rx: mpsc::Receiver<TickSignal>,
}

impl Ticks {
    pub async fn recv(&mut self) -> Option<TickSignal> {
        self.rx.recv().await
    }
}

/// Create a tick channel
pub fn trigger(name: impl Into<Arc<str>>) -> (TickTrigger, Ticks) {
    let (tx, rx) = mpsc::channel(1);
    (
        TickTrigger {
            name: name.into(),
            tx,
        },
        Ticks { rx },
    )
}

impl TickTrigger {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fire one tick and wait until the consumer has handled it
    pub async fn tick(&self) -> Result<()> {
        let closed = || PipeError::TriggerClosed {
            ticker: self.name.to_string(),
        };

        let (done, handled) = oneshot::channel();
        self.tx
            .send(TickSignal { done })
            .await
            .map_err(|_| closed())?;
        handled.await.map_err(|_| closed())?;
        Ok(())
    }

    /// Fire a tick every `interval` until the returned cancellation is signaled
    ///
    /// Ticks never overlap: the next interval starts counting only after the
    /// consumer finished the previous tick. The loop also stops on its own
    /// once the consumer is gone. Intervals shorter than
    /// [`MIN_TICK_INTERVAL`] are raised to it.
    pub fn tick_every(&self, interval: Duration) -> Cancellation {
        if interval < MIN_TICK_INTERVAL {
            warn!(
                ticker = %self.name,
                interval_ms = interval.as_millis() as u64,
                "tick interval below minimum, using 1ms"
            );
        }
        let interval = interval.max(MIN_TICK_INTERVAL);
        let cancellation = Cancellation::new();
        let stop = cancellation.clone();
        let trigger = self.clone();

        tokio::spawn(async move {
            debug!(
                ticker = %trigger.name,
                interval_ms = interval.as_millis() as u64,
                "tick loop started"
            );

            let mut timer = time::interval_at(Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop.signaled() => break,
                    _ = timer.tick() => {
                        trace!(ticker = %trigger.name, "tick");
                        tokio::select! {
                            biased;
                            _ = stop.signaled() => break,
                            result = trigger.tick() => {
                                if let Err(e) = result {
                                    debug!(ticker = %trigger.name, error = %e, "tick consumer gone");
                                    break;
                                }
                            }
                        }
                    }
                }
            }

            debug!(ticker = %trigger.name, "tick loop stopped");
        });

        cancellation
    }
}

/// A periodic tick task that has not been started yet
#[derive(Debug)]
pub struct TickJob {
    trigger: TickTrigger,
    interval: Duration,
}

impl TickJob {
    pub fn new(trigger: TickTrigger, interval: Duration) -> Self {
        Self { trigger, interval }
    }

    pub fn name(&self) -> &str {
        self.trigger.name()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the periodic trigger
    pub fn start(self) -> Cancellation {
        self.trigger.tick_every(self.interval)
    }
}
