//! Composable processing stages
//!
//! A [`Pipe`] is built from combinators and only becomes live when it is run
//! against a terminal continuation:
//! - Stateless stages (`map`, `filter`, `filter_map`) wrap the continuation
//! - Stateful stages (`buffer`, `sliding_window`) own a sequential loop
//! - Time-based stages (`tick`, `buffer_time`) own a ticker loop and register
//!   the periodic task that drives it
//! - `merge` and `flatten` fan items out and join the results
//!
//! The terminal result type decides the flavor: `()` for fire-and-forget
//! processing, [`DeliveryReceipt`] when the sink confirms delivery.
//!
//! # Example
//!
//! ```rust,no_run
//! use processor::pipeline::{cont, Pipe};
//! use std::time::Duration;
//!
//! # async fn example() -> processor::Result<()> {
//! let running = Pipe::<u64, (), u64>::start()
//!     .filter(|value| *value > 10)
//!     .buffer_time(Duration::from_secs(1))
//!     .map(|batch| batch.len())
//!     .run(cont(|count: usize| async move {
//!         println!("{count} large values");
//!         Ok(Some(()))
//!     }));
//!
//! running.call(42).await?;
//! running.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod ack;
pub mod pipe;
pub mod stage;
pub mod window;

pub use ack::{promise, AckHandle, Acknowledger, DeliveryReceipt, Fanout};
pub use pipe::{Pipe, RunningPipe};
pub use stage::{cont, spawn_bounded_stage, spawn_stage, spawn_ticker, Cont, Inbox};
pub use window::SlidingWindow;
