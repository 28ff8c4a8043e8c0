//! Statistics over streaming samples
//!
//! - [`Snapshot`]: immutable sorted sample set with quantile statistics
//!   (median, p75, p95, p98, p99, p999, mean, standard deviation, min, max)
//! - [`EwmaState`]: exponentially weighted moving rate advanced by ticks
//!
//! Both are plain values. The tickers in [`crate::ticker`] own one instance
//! each and drive them from their consumer loop.
//!
//! # Examples
//!
//! ```rust
//! use processor::aggregation::Snapshot;
//!
//! let latencies = Snapshot::new(vec![120, 80, 95, 310, 101]);
//! assert_eq!(latencies.max(), 310);
//! assert!(latencies.p99() <= 310.0);
//! ```

pub mod ewma;
pub mod snapshot;

pub use ewma::{alpha, EwmaState};
pub use snapshot::Snapshot;
