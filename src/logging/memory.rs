// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! Bounded in-memory sink

use std::collections::VecDeque;

use parking_lot::RwLock;

use super::{Category, LogRecord, LogSink};
use crate::relay::RelayId;

/// Keeps the most recent records in memory
pub struct MemorySink {
    capacity: usize,
    records: RwLock<VecDeque<LogRecord>>,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: RwLock::new(VecDeque::new()),
        }
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.read().iter().cloned().collect()
    }

    pub fn by_category(&self, category: Category) -> Vec<LogRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.category == category)
            .cloned()
            .collect()
    }

    pub fn for_relay(&self, relay: RelayId) -> Vec<LogRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.relay == Some(relay))
            .cloned()
            .collect()
    }
}

impl LogSink for MemorySink {
    fn record(&self, record: &LogRecord) {
        let mut records = self.records.write();
        records.push_back(record.clone());
        while records.len() > self.capacity {
            records.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Severity;

    #[test]
    fn test_keeps_only_latest() {
        let sink = MemorySink::new(3);
        for i in 0..5 {
            sink.record(&LogRecord::new(Severity::Info, Category::Received, None, format!("m{i}")));
        }
        let messages: Vec<_> = sink.records().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["m2", "m3", "m4"]);
    }
}
