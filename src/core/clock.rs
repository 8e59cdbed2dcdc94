// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! Wall clock sources for relay evaluation
//!
//! Readings carry their UTC offset: timer windows use the local time of
//! day, ping intervals use the UTC instant.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use tokio::time::Instant;

/// Wall-clock time as seen by the evaluators
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The host's local time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let now = Local::now();
        now.with_timezone(now.offset())
    }
}

/// Wall time derived from the tokio clock, starting at a fixed instant
///
/// Advances with `tokio::time`, so paused-time runs and simulations see
/// timer windows and probe intervals move in step with their sleeps.
#[derive(Debug, Clone, Copy)]
pub struct AnchoredClock {
    base: DateTime<FixedOffset>,
    start: Instant,
}

impl AnchoredClock {
    /// Anchor at `base`, read as UTC
    pub fn new(base: NaiveDateTime) -> Self {
        Self::at(Utc.from_utc_datetime(&base).into())
    }

    pub fn at(base: DateTime<FixedOffset>) -> Self {
        Self {
            base,
            start: Instant::now(),
        }
    }
}

impl Clock for AnchoredClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let elapsed = chrono::Duration::from_std(self.start.elapsed()).unwrap_or_else(|_| chrono::Duration::zero());
        self.base + elapsed
    }
}
