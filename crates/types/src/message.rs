//! Log and metric messages
//!
//! A [`Message`] is the unit flowing through every pipeline stage. Stages never
//! mutate a message they were handed; the builder methods below consume the
//! message and return the updated value.

use crate::level::Level;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Context key holding the originating service name
pub const SERVICE_KEY: &str = "service";

/// Context key holding the names of the targets a message is routed to
pub const SINKS_KEY: &str = "_sinks";

/// Unit of a gauge value
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    #[default]
    Scalar,
    Count,
    Seconds,
    Milliseconds,
    Bytes,
    PerSecond,
}

/// Payload of a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Value {
    /// Free-form log event
    Event { template: String },
    /// Numeric measurement
    Gauge { value: f64, units: Units },
}

/// A log event or metric sample
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Logger or metric name
    #[serde(default)]
    pub name: String,
    /// Event template or gauge value
    pub value: Value,
    /// Severity
    #[serde(default)]
    pub level: Level,
    /// Structured context
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
    /// Tags attached by producers or pipeline stages
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// When the message was created
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a log event
    pub fn event(level: Level, template: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            value: Value::Event {
                template: template.into(),
            },
            level,
            context: BTreeMap::new(),
            tags: BTreeSet::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a gauge sample at `Info` level
    pub fn gauge(name: impl Into<String>, value: f64, units: Units) -> Self {
        Self {
            name: name.into(),
            value: Value::Gauge { value, units },
            level: Level::Info,
            context: BTreeMap::new(),
            tags: BTreeSet::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Add a context field
    pub fn with_context(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_service(self, service: impl Into<String>) -> Self {
        self.with_context(SERVICE_KEY, service.into())
    }

    /// Route the message to the named targets
    pub fn with_sinks<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<serde_json::Value> = names
            .into_iter()
            .map(|name| serde_json::Value::String(name.into()))
            .collect();
        self.with_context(SINKS_KEY, names)
    }

    /// Service that produced the message, if recorded
    pub fn service(&self) -> Option<&str> {
        self.context.get(SERVICE_KEY).and_then(|v| v.as_str())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Target names set by [`Message::with_sinks`]; empty when unrouted
    pub fn sinks(&self) -> Vec<&str> {
        match self.context.get(SINKS_KEY) {
            Some(serde_json::Value::Array(names)) => {
                names.iter().filter_map(|name| name.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Numeric value of a gauge message
    pub fn gauge_value(&self) -> Option<f64> {
        match self.value {
            Value::Gauge { value, .. } => Some(value),
            Value::Event { .. } => None,
        }
    }

    /// Template of an event message
    pub fn template(&self) -> Option<&str> {
        match &self.value {
            Value::Event { template } => Some(template),
            Value::Gauge { .. } => None,
        }
    }
}
