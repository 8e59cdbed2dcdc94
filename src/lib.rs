// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! RelayWatch - GPIO relay supervisor for small single-board computers
//!
//! Drives a bank of relays from GPIO lines, each in one of three modes:
//! - `none`: manual on/off only
//! - `ping`: power-cycle a device after repeated failed reachability probes
//! - `timer`: hold the relay on inside a daily time window
//!
//! Every state change, probe result and fault is recorded through
//! pluggable log sinks (file, tracing, in-memory).
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      RelayWatch Engine                     │
//! ├────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────┐        ┌─────────────────────────┐  │
//! │  │ Monitor Scheduler │ tick → │    Relay Controller     │  │
//! │  │  (task per relay) │        │ ping / timer evaluators │  │
//! │  └───────────────────┘        └─────────────────────────┘  │
//! │        ↓ probe                  ↓ set_level     ↓ record   │
//! │  ┌───────────────────┐  ┌─────────────┐  ┌──────────────┐  │
//! │  │  Probe (tcp/http) │  │  Actuator   │  │  Log Sinks   │  │
//! │  └───────────────────┘  │ (sysfs GPIO)│  └──────────────┘  │
//! │                         └─────────────┘                    │
//! └────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod actuator;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod probe;
pub mod relay;

// Re-exports for convenience
pub use config::Config;
pub use core::{Engine, MonitorScheduler, PulsePolicy, RelayController};
pub use error::{ActuatorError, RelayError, RelayResult};
pub use logging::{Category, LogRecord, LogSink, Severity};
pub use relay::{Level, Mode, ModeParams, RelayId, RelayStatus};

/// RelayWatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// RelayWatch name
pub const NAME: &str = "RelayWatch";

/// Build info
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        rust_version: env!("CARGO_PKG_RUST_VERSION").to_string(),
        target: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
        features: enabled_features(),
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version string
    pub version: String,
    /// Rust version
    pub rust_version: String,
    /// Target architecture
    pub target: String,
    /// Operating system
    pub os: String,
    /// Enabled features
    pub features: Vec<String>,
}

fn enabled_features() -> Vec<String> {
    let mut features = vec![];

    #[cfg(feature = "http")]
    features.push("http".to_string());

    features
}
