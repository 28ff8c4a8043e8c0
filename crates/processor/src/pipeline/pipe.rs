use super::ack::{gather, Fanout};
use super::stage::{spawn_bounded_stage, spawn_stage, spawn_ticker, Cont, Inbox};
use super::window::SlidingWindow;
use crate::error::Result;
use crate::ticker::{trigger, BufferTicker, Cancellation, TickJob, Ticker, Ticks};
use futures::future::{self, join_all};
use futures::FutureExt;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

type Build<C, R, S> = Box<dyn FnOnce(Cont<C, R>) -> Cont<S, R> + Send>;

/// A composable processing stage
///
/// `S` is the item type fed into the pipe, `C` the item type handed to the
/// downstream continuation and `R` the result the terminal sink produces.
///
/// A pipe is only a recipe until it is run: `build` wires the stages to a
/// continuation and spawns their consumer loops, and the tick jobs collected
/// by time-based combinators are started afterwards. Building consumes the
/// pipe, so tick jobs can never be started twice.
pub struct Pipe<C, R, S> {
    build: Build<C, R, S>,
    tick_jobs: Vec<TickJob>,
}

impl<C, R, S> fmt::Debug for Pipe<C, R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("tick_jobs", &self.tick_jobs)
            .finish_non_exhaustive()
    }
}

impl<S, R> Pipe<S, R, S>
where
    S: Send + 'static,
    R: Send + 'static,
{
    /// A pipe that forwards every item through its own sequential loop
    pub fn start() -> Self {
        Pipe {
            build: Box::new(|next: Cont<S, R>| -> Cont<S, R> {
                spawn_stage("start", (), |_, item: S| Some(item), next).into_cont()
            }),
            tick_jobs: Vec::new(),
        }
    }
}

impl<C, R, S> Pipe<C, R, S>
where
    C: Send + 'static,
    R: Send + 'static,
    S: Send + 'static,
{
    /// Wrap the continuation the pipe hands its items to
    pub fn chain<C2, F>(self, f: F) -> Pipe<C2, R, S>
    where
        C2: Send + 'static,
        F: FnOnce(Cont<C2, R>) -> Cont<C, R> + Send + 'static,
    {
        let build = self.build;
        Pipe {
            build: Box::new(move |next: Cont<C2, R>| build(f(next))),
            tick_jobs: self.tick_jobs,
        }
    }

    /// Register a periodic task to start when the pipe runs
    pub fn with_tick_job(mut self, job: TickJob) -> Self {
        self.tick_jobs.push(job);
        self
    }

    pub fn tick_jobs(&self) -> &[TickJob] {
        &self.tick_jobs
    }

    pub fn map<C2, F>(self, f: F) -> Pipe<C2, R, S>
    where
        C2: Send + 'static,
        F: Fn(C) -> C2 + Send + Sync + 'static,
    {
        self.chain(move |next: Cont<C2, R>| -> Cont<C, R> { Arc::new(move |item: C| next(f(item))) })
    }

    /// Forward only items matching `predicate`
    ///
    /// Dropped items complete with no result; the downstream never sees them.
    pub fn filter<P>(self, predicate: P) -> Pipe<C, R, S>
    where
        P: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.chain(move |next: Cont<C, R>| -> Cont<C, R> {
            Arc::new(move |item: C| {
                if predicate(&item) {
                    next(item)
                } else {
                    future::ready(Ok(None)).boxed()
                }
            })
        })
    }

    pub fn filter_map<C2, F>(self, f: F) -> Pipe<C2, R, S>
    where
        C2: Send + 'static,
        F: Fn(C) -> Option<C2> + Send + Sync + 'static,
    {
        self.chain(move |next: Cont<C2, R>| -> Cont<C, R> {
            Arc::new(move |item: C| match f(item) {
                Some(mapped) => next(mapped),
                None => future::ready(Ok(None)).boxed(),
            })
        })
    }

    /// Forward items in batches of `n`
    ///
    /// Items below a full batch complete with no result. A size of zero is
    /// treated as one.
    pub fn buffer(self, n: usize) -> Pipe<Vec<C>, R, S> {
        let n = n.max(1);
        self.chain(move |next: Cont<Vec<C>, R>| -> Cont<C, R> {
            spawn_stage(
                "buffer",
                Vec::with_capacity(n),
                move |buffer: &mut Vec<C>, item: C| {
                    buffer.push(item);
                    if buffer.len() >= n {
                        Some(std::mem::replace(buffer, Vec::with_capacity(n)))
                    } else {
                        None
                    }
                },
                next,
            )
            .into_cont()
        })
    }

    /// Forward the last `size` items on every item, oldest first
    ///
    /// The first `size - 1` windows are partial: they hold only the items
    /// seen so far.
    pub fn sliding_window(self, size: usize) -> Pipe<Vec<C>, R, S>
    where
        C: Clone,
    {
        self.chain(move |next: Cont<Vec<C>, R>| -> Cont<C, R> {
            spawn_stage(
                "sliding_window",
                SlidingWindow::new(size),
                |window: &mut SlidingWindow<C>, item: C| {
                    window.push(item);
                    Some(window.items())
                },
                next,
            )
            .into_cont()
        })
    }

    /// Fold items with `ticker` and emit its output every `interval`
    pub fn tick<K>(self, ticker: K, interval: Duration) -> Pipe<K::Output, R, S>
    where
        K: Ticker<Item = C>,
    {
        let (trigger, ticks) = trigger(ticker.name());
        self.tick_on(ticker, ticks)
            .with_tick_job(TickJob::new(trigger, interval))
    }

    /// Fold items with `ticker` and emit whenever `ticks` delivers a signal
    ///
    /// No periodic task is registered; the caller owns the trigger.
    pub fn tick_on<K>(self, ticker: K, ticks: Ticks) -> Pipe<K::Output, R, S>
    where
        K: Ticker<Item = C>,
    {
        self.chain(move |next: Cont<K::Output, R>| -> Cont<C, R> {
            spawn_ticker(ticker, ticks, next).into_cont()
        })
    }

    /// Collect items and forward them as one batch every `interval`
    ///
    /// Intervals without items are skipped.
    pub fn buffer_time(self, interval: Duration) -> Pipe<Vec<C>, R, S> {
        self.tick(BufferTicker::new(), interval)
            .filter(|batch: &Vec<C>| !batch.is_empty())
    }

    /// Build the stages against `sink` and start every tick job
    pub fn run(self, sink: Cont<C, R>) -> RunningPipe<S, R> {
        self.run_with_capacity(sink, 1)
    }

    /// Like [`Pipe::run`], with room for `capacity` items in the root inbox
    ///
    /// Submitters only wait once the root inbox is full.
    pub fn run_with_capacity(self, sink: Cont<C, R>, capacity: usize) -> RunningPipe<S, R> {
        let handler = (self.build)(sink);
        let inbox = spawn_bounded_stage("root", capacity, (), |_, item: S| Some(item), handler);

        let cancellations: Vec<Cancellation> = self
            .tick_jobs
            .into_iter()
            .map(|job| {
                debug!(
                    ticker = job.name(),
                    interval_ms = job.interval().as_millis() as u64,
                    "starting tick job"
                );
                job.start()
            })
            .collect();

        info!(tick_jobs = cancellations.len(), "pipe running");
        RunningPipe {
            inbox,
            cancellations,
        }
    }
}

impl<T, R, S> Pipe<Vec<T>, R, S>
where
    T: Send + 'static,
    R: Fanout,
    S: Send + 'static,
{
    /// Hand every member of a batch to the downstream concurrently
    ///
    /// The batch completes once every member has completed; results are
    /// joined with [`Fanout::join`].
    pub fn flatten(self) -> Pipe<T, R, S> {
        self.chain(|next: Cont<T, R>| -> Cont<Vec<T>, R> {
            Arc::new(move |batch: Vec<T>| {
                let calls: Vec<_> = batch.into_iter().map(|item| next(item)).collect();
                async move { gather("flatten", join_all(calls).await) }.boxed()
            })
        })
    }
}

impl<C, R, S> Pipe<C, R, S>
where
    C: Send + 'static,
    R: Fanout,
    S: Clone + Send + 'static,
{
    /// Feed every item to all `pipes` concurrently
    ///
    /// The merged pipe completes an item once every member has completed it.
    /// A failing member does not cancel its siblings.
    pub fn merge(pipes: Vec<Pipe<C, R, S>>) -> Pipe<C, R, S> {
        let mut builds = Vec::with_capacity(pipes.len());
        let mut tick_jobs = Vec::new();
        for pipe in pipes {
            builds.push(pipe.build);
            tick_jobs.extend(pipe.tick_jobs);
        }

        Pipe {
            build: Box::new(move |next: Cont<C, R>| -> Cont<S, R> {
                let handlers: Vec<Cont<S, R>> =
                    builds.into_iter().map(|build| build(next.clone())).collect();
                Arc::new(move |item: S| {
                    let calls: Vec<_> = handlers.iter().map(|handler| handler(item.clone())).collect();
                    async move { gather("merge", join_all(calls).await) }.boxed()
                })
            }),
            tick_jobs,
        }
    }
}

/// A pipe whose stages and tick jobs are live
///
/// Dropping it signals every tick job's cancellation and closes the root
/// inbox, after which the stage loops wind down.
pub struct RunningPipe<S, R> {
    inbox: Inbox<S, R>,
    cancellations: Vec<Cancellation>,
}

impl<S, R> fmt::Debug for RunningPipe<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningPipe")
            .field("inbox", &self.inbox)
            .field("tick_jobs", &self.cancellations.len())
            .finish()
    }
}

impl<S, R> RunningPipe<S, R>
where
    S: Send + 'static,
    R: Send + 'static,
{
    /// Process one item and wait for its result
    pub async fn call(&self, item: S) -> Result<Option<R>> {
        self.inbox.call(item).await
    }

    /// Hand one item to the root stage without waiting for its result
    pub async fn submit(&self, item: S) -> Result<()> {
        self.inbox.submit(item).await
    }

    pub fn inbox(&self) -> Inbox<S, R> {
        self.inbox.clone()
    }

    pub fn tick_jobs(&self) -> usize {
        self.cancellations.len()
    }

    /// Stop every tick job
    ///
    /// Items can still be pushed afterwards, but time-based stages no longer
    /// emit once their loops observe the stop. A tick that was already handed
    /// to a stage before this call is still handled and may emit after it
    /// returns.
    pub fn shutdown(&self) {
        for cancellation in &self.cancellations {
            cancellation.signal();
        }
        info!(tick_jobs = self.cancellations.len(), "pipe shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancellations.iter().all(Cancellation::is_signaled)
    }
}

impl<S, R> Drop for RunningPipe<S, R> {
    fn drop(&mut self) {
        for cancellation in &self.cancellations {
            cancellation.signal();
        }
    }
}
