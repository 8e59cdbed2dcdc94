// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! Thread-safe append-only file sink

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Category, LogRecord, LogSink, Severity};

/// Line format written by [`FileSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `2026-01-31 08:00:00 - INFO - message`
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Appends relay events to a file
///
/// Records below `min_severity` or outside the enabled categories are
/// dropped. Writers from any thread are serialised on one handle.
pub struct FileSink {
    path: PathBuf,
    min_severity: Severity,
    categories: HashSet<Category>,
    format: LogFormat,
    file: Mutex<File>,
}

impl FileSink {
    pub fn open(
        path: &Path,
        min_severity: Severity,
        categories: impl IntoIterator<Item = Category>,
        format: LogFormat,
    ) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            min_severity,
            categories: categories.into_iter().collect(),
            format,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn accepts(&self, record: &LogRecord) -> bool {
        record.severity >= self.min_severity && self.categories.contains(&record.category)
    }

    fn render(&self, record: &LogRecord) -> String {
        match self.format {
            LogFormat::Text => format!(
                "{} - {} - {}\n",
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.severity,
                record.text()
            ),
            LogFormat::Json => match serde_json::to_string(record) {
                Ok(line) => line + "\n",
                Err(e) => format!("{{\"error\":\"unserialisable record: {e}\"}}\n"),
            },
        }
    }
}

impl LogSink for FileSink {
    fn record(&self, record: &LogRecord) {
        if !self.accepts(record) {
            return;
        }
        let line = self.render(record);
        let mut file = self.file.lock();
        if let Err(e) = file.write_all(line.as_bytes()).and_then(|_| file.flush()) {
            warn!("Failed to write {:?}: {}", self.path, e);
        }
    }
}
