// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! Relay event logging - severity-tagged, categorised records and their sinks

mod file;
mod memory;
mod trace;

pub use file::{FileSink, LogFormat};
pub use memory::MemorySink;
pub use trace::TracingSink;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::relay::RelayId;

/// Record severity, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Relay lifecycle event categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Probe results
    Connection,
    /// Commands received (manual overrides, timer switches)
    Received,
    /// Reset pulses
    Reset,
    /// Boot and shutdown sequencing
    Boot,
    /// Failures
    Error,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Connection,
        Category::Received,
        Category::Reset,
        Category::Boot,
        Category::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Connection => "connection",
            Category::Received => "received",
            Category::Reset => "reset",
            Category::Boot => "boot",
            Category::Error => "error",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("invalid log type '{s}'"))
    }
}

/// One relay event
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub category: Category,
    pub relay: Option<RelayId>,
    pub message: String,
}

impl LogRecord {
    pub fn new(severity: Severity, category: Category, relay: Option<RelayId>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            severity,
            category,
            relay,
            message: message.into(),
        }
    }

    /// Message prefixed with the relay id when there is one
    pub fn text(&self) -> String {
        match self.relay {
            Some(id) => format!("{}: {}", id, self.message),
            None => self.message.clone(),
        }
    }
}

/// Destination for relay events
pub trait LogSink: Send + Sync {
    fn record(&self, record: &LogRecord);
}

/// Fans each record out to several sinks
#[derive(Default, Clone)]
pub struct SinkSet {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl LogSink for SinkSet {
    fn record(&self, record: &LogRecord) {
        for sink in &self.sinks {
            sink.record(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels_and_types() {
        assert_eq!("WARNING".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("info".parse::<Severity>().unwrap(), Severity::Info);
        assert!("loud".parse::<Severity>().is_err());
        assert_eq!("Reset".parse::<Category>().unwrap(), Category::Reset);
        assert!("telemetry".parse::<Category>().is_err());
    }

    #[test]
    fn test_sink_set_fans_out() {
        let a = Arc::new(MemorySink::new(10));
        let b = Arc::new(MemorySink::new(10));
        let set = SinkSet::new().with(a.clone()).with(b.clone());
        set.record(&LogRecord::new(Severity::Info, Category::Boot, None, "booted"));
        assert_eq!(a.records().len(), 1);
        assert_eq!(b.records().len(), 1);
    }
}
