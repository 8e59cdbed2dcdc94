//! Sink forwarding relay events into `tracing`

use tracing::{debug, error, info, warn};

use super::{LogRecord, LogSink, Severity};

/// Emits each record as a `tracing` event tagged with its category
#[derive(Debug, Default, Clone)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for TracingSink {
    fn record(&self, record: &LogRecord) {
        let category = record.category.as_str();
        let text = record.text();
        match record.severity {
            Severity::Debug => debug!(category, "{}", text),
            Severity::Info => info!(category, "{}", text),
            Severity::Warning => warn!(category, "{}", text),
            Severity::Error => error!(category, "{}", text),
            Severity::Critical => error!(category, critical = true, "{}", text),
        }
    }
}
