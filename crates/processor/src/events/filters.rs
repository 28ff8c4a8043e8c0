//! Named message filters and derived metric streams

use crate::aggregation::Snapshot;
use crate::pipeline::Pipe;
use crate::ticker::{CountTicker, EwmaTicker, SnapshotTicker};
use logflow_types::{Level, Message, Units};
use std::time::Duration;

impl<R, S> Pipe<Message, R, S>
where
    R: Send + 'static,
    S: Send + 'static,
{
    /// Keep messages recorded for `name`
    pub fn service(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.filter(move |message: &Message| message.service() == Some(name.as_str()))
    }

    /// Keep messages carrying `tag`
    pub fn tag(self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        self.filter(move |message: &Message| message.has_tag(&tag))
    }

    /// Keep messages at `level` or above
    pub fn min_level(self, level: Level) -> Self {
        self.filter(move |message: &Message| message.level >= level)
    }

    /// Route messages to the named targets only
    pub fn sink<I, N>(self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.map(move |message: Message| message.with_sinks(names.iter().cloned()))
    }

    /// Emit the number of messages seen every `interval`, zero included
    pub fn counter(self, name: impl Into<String>, interval: Duration) -> Self {
        let name = name.into();
        self.tick(CountTicker::new(), interval)
            .map(move |count: u64| Message::gauge(name.clone(), count as f64, Units::Count))
    }

    /// Emit percentile statistics of gauge values every `interval`
    ///
    /// Gauge values are rounded to integers. Event messages are ignored and
    /// intervals without gauges emit nothing.
    pub fn percentiles(self, name: impl Into<String>, interval: Duration) -> Self {
        let name = name.into();
        self.filter_map(|message: Message| message.gauge_value().map(|value| value.round() as i64))
            .tick(SnapshotTicker::new(), interval)
            .filter(|snapshot: &Snapshot| !snapshot.is_empty())
            .map(move |snapshot: Snapshot| percentile_message(&name, &snapshot))
    }

    /// Emit the smoothed per-second message rate every `interval`
    pub fn rate(self, name: impl Into<String>, interval: Duration, alpha_period: Duration) -> Self {
        let name = name.into();
        self.map(|_message: Message| 1i64)
            .tick(EwmaTicker::new(alpha_period, Duration::from_secs(1)), interval)
            .map(move |rate: f64| Message::gauge(name.clone(), rate, Units::PerSecond))
    }
}

/// Gauge message for a snapshot: the median as value, the rest as context
pub fn percentile_message(name: &str, snapshot: &Snapshot) -> Message {
    Message::gauge(name, snapshot.median(), Units::Scalar)
        .with_context("count", snapshot.len())
        .with_context("min", snapshot.min())
        .with_context("max", snapshot.max())
        .with_context("mean", snapshot.mean())
        .with_context("stddev", snapshot.std_dev())
        .with_context("p75", snapshot.p75())
        .with_context("p95", snapshot.p95())
        .with_context("p98", snapshot.p98())
        .with_context("p99", snapshot.p99())
        .with_context("p999", snapshot.p999())
}
