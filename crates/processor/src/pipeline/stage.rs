//! Sequential consumer loops
//!
//! Every stateful stage of a pipe runs as one spawned task that owns the
//! stage state and receives `(item, reply)` envelopes over a single-consumer
//! channel. Producers only contend on the channel; the state itself is never
//! shared, so no stage needs a lock.

use crate::error::{PipeError, Result};
use crate::ticker::{Ticker, Ticks};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Handles one item and completes with an optional result
///
/// `Ok(None)` means the item was absorbed by the stage (filtered out or
/// buffered) and nothing reached the downstream continuation.
pub type Cont<T, R> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<Option<R>>> + Send + Sync>;

/// Box an async function into a [`Cont`]
pub fn cont<T, R, F, Fut>(f: F) -> Cont<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<R>>> + Send + 'static,
{
    Arc::new(move |item: T| f(item).boxed())
}

type Reply<R> = oneshot::Sender<Result<Option<R>>>;

pub(crate) struct Envelope<T, R> {
    item: T,
    reply: Option<Reply<R>>,
}

/// Hand-off channel into a stage's consumer loop
pub struct Inbox<T, R> {
    stage: Arc<str>,
    tx: mpsc::Sender<Envelope<T, R>>,
}

impl<T, R> Clone for Inbox<T, R> {
    fn clone(&self) -> Self {
        Self {
            stage: self.stage.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<T, R> fmt::Debug for Inbox<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inbox")
            .field("stage", &self.stage)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<T: Send + 'static, R: Send + 'static> Inbox<T, R> {
    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Hand the item over and wait for the stage to finish processing it
    pub async fn call(&self, item: T) -> Result<Option<R>> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope {
                item,
                reply: Some(reply),
            })
            .await
            .map_err(|_| PipeError::StageClosed {
                stage: self.stage.to_string(),
            })?;

        response.await.map_err(|_| PipeError::ReplyDropped {
            stage: self.stage.to_string(),
        })?
    }

    /// Hand the item over without waiting for its result
    ///
    /// Failures of submitted items are logged by the stage.
    pub async fn submit(&self, item: T) -> Result<()> {
        self.tx
            .send(Envelope { item, reply: None })
            .await
            .map_err(|_| PipeError::StageClosed {
                stage: self.stage.to_string(),
            })?;
        Ok(())
    }

    pub fn into_cont(self) -> Cont<T, R> {
        Arc::new(move |item: T| {
            let inbox = self.clone();
            async move { inbox.call(item).await }.boxed()
        })
    }
}

fn respond<R>(stage: &str, reply: Option<Reply<R>>, result: Result<Option<R>>) {
    match reply {
        // The caller may have stopped waiting; nothing left to do then.
        Some(reply) => {
            let _ = reply.send(result);
        }
        None => {
            if let Err(e) = result {
                warn!(stage = %stage, error = %e, "submitted item failed");
            }
        }
    }
}

/// Spawn a sequential loop that owns `state`
///
/// For every item `step` updates the state and decides whether something is
/// forwarded downstream. Items are handled strictly in arrival order and the
/// next item is not taken before the downstream call for the previous one
/// has completed.
pub fn spawn_stage<T, D, R, St, F>(
    stage: &str,
    state: St,
    step: F,
    downstream: Cont<D, R>,
) -> Inbox<T, R>
where
    T: Send + 'static,
    D: Send + 'static,
    R: Send + 'static,
    St: Send + 'static,
    F: FnMut(&mut St, T) -> Option<D> + Send + 'static,
{
    spawn_bounded_stage(stage, 1, state, step, downstream)
}

/// Like [`spawn_stage`], but up to `capacity` items may wait in the inbox
///
/// A capacity of zero is treated as one.
pub fn spawn_bounded_stage<T, D, R, St, F>(
    stage: &str,
    capacity: usize,
    state: St,
    step: F,
    downstream: Cont<D, R>,
) -> Inbox<T, R>
where
    T: Send + 'static,
    D: Send + 'static,
    R: Send + 'static,
    St: Send + 'static,
    F: FnMut(&mut St, T) -> Option<D> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let stage: Arc<str> = Arc::from(stage);
    tokio::spawn(run_stage(stage.clone(), rx, state, step, downstream));
    Inbox { stage, tx }
}

async fn run_stage<T, D, R, St, F>(
    stage: Arc<str>,
    mut rx: mpsc::Receiver<Envelope<T, R>>,
    mut state: St,
    mut step: F,
    downstream: Cont<D, R>,
) where
    F: FnMut(&mut St, T) -> Option<D>,
{
    debug!(stage = %stage, "stage loop started");

    while let Some(Envelope { item, reply }) = rx.recv().await {
        let result = match step(&mut state, item) {
            Some(next) => downstream(next).await,
            None => Ok(None),
        };
        respond(&stage, reply, result);
    }

    debug!(stage = %stage, "stage loop stopped");
}

/// Spawn the consumer loop of a ticker
///
/// The loop races incoming items against tick signals. Items are folded into
/// the ticker state and answered with no result; a tick turns the state into
/// an output, forwards it downstream and only then completes the tick signal.
pub fn spawn_ticker<K, R>(ticker: K, ticks: Ticks, downstream: Cont<K::Output, R>) -> Inbox<K::Item, R>
where
    K: Ticker,
    R: Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    let stage: Arc<str> = Arc::from(ticker.name());
    tokio::spawn(run_ticker(stage.clone(), ticker, ticks, rx, downstream));
    Inbox { stage, tx }
}

async fn run_ticker<K, R>(
    stage: Arc<str>,
    ticker: K,
    mut ticks: Ticks,
    mut rx: mpsc::Receiver<Envelope<K::Item, R>>,
    downstream: Cont<K::Output, R>,
) where
    K: Ticker,
    R: Send + 'static,
{
    debug!(stage = %stage, "ticker loop started");

    let mut state = ticker.initial();
    let mut ticks_open = true;

    loop {
        tokio::select! {
            envelope = rx.recv() => {
                let Some(Envelope { item, reply }) = envelope else {
                    break;
                };
                state = ticker.fold(state, item);
                respond(&stage, reply, Ok(None));
            }
            signal = ticks.recv(), if ticks_open => {
                match signal {
                    Some(signal) => {
                        let (next, output) = ticker.handle_tick(state);
                        state = next;
                        if let Err(e) = downstream(output).await {
                            warn!(stage = %stage, error = %e, "tick emission failed");
                        }
                        signal.complete();
                    }
                    None => ticks_open = false,
                }
            }
        }
    }

    debug!(stage = %stage, "ticker loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticker::{trigger, BufferTicker};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn collect<T: Send + 'static>() -> (Cont<T, ()>, UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = cont(move |item: T| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(item);
                Ok(Some(()))
            }
        });
        (sink, rx)
    }

    #[tokio::test]
    async fn test_stage_preserves_order() {
        let (sink, mut rx) = collect::<u32>();
        let inbox = spawn_stage("identity", (), |_, item| Some(item), sink);

        for i in 0..20 {
            assert_eq!(inbox.call(i).await.unwrap(), Some(()));
        }
        for i in 0..20 {
            assert_eq!(rx.recv().await, Some(i));
        }
    }

    #[tokio::test]
    async fn test_stage_owns_state() {
        let (sink, mut rx) = collect::<u32>();
        let inbox = spawn_stage(
            "running_sum",
            0u32,
            |total, item: u32| {
                *total += item;
                Some(*total)
            },
            sink,
        );

        for i in 1..=4 {
            inbox.call(i).await.unwrap();
        }
        let mut sums = Vec::new();
        while let Ok(sum) = rx.try_recv() {
            sums.push(sum);
        }
        assert_eq!(sums, vec![1, 3, 6, 10]);
    }

    #[tokio::test]
    async fn test_absorbed_item_has_no_result() {
        let (sink, mut rx) = collect::<u32>();
        let inbox = spawn_stage("drop_all", (), |_, _item: u32| None::<u32>, sink);

        assert_eq!(inbox.call(1).await.unwrap(), None);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_submit_does_not_wait_for_result() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let sink = cont(move |_item: u32| {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(Some(()))
            }
        });
        let inbox = spawn_stage("submit", (), |_, item| Some(item), sink);

        inbox.submit(1).await.unwrap();
        // A call queues behind the submitted item.
        inbox.call(2).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ticker_loop_folds_and_emits() {
        let (sink, mut rx) = collect::<Vec<u32>>();
        let (trigger, ticks) = trigger("buffer");
        let inbox = spawn_ticker(BufferTicker::new(), ticks, sink);

        for i in 0..3 {
            assert_eq!(inbox.call(i).await.unwrap(), None);
        }
        assert!(rx.try_recv().is_err());

        trigger.tick().await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), vec![0, 1, 2]);

        trigger.tick().await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), Vec::<u32>::new());
    }

    #[tokio::test]
    async fn test_ticker_keeps_folding_after_trigger_dropped() {
        let (sink, _rx) = collect::<Vec<u32>>();
        let (trigger, ticks) = trigger("buffer");
        let inbox = spawn_ticker(BufferTicker::new(), ticks, sink);
        drop(trigger);

        assert_eq!(inbox.call(7).await.unwrap(), None);
        assert_eq!(inbox.call(8).await.unwrap(), None);
    }
}
