// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! Relay data model - ids, levels, modes and per-relay state

pub mod ping;
pub mod timer;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};

pub use ping::PingDecision;

/// Relay identifier, unique for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayId(pub u32);

impl fmt::Display for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relay-{}", self.0)
    }
}

/// Logical relay output level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    On,
    Off,
}

impl Level {
    pub fn toggled(self) -> Self {
        match self {
            Level::On => Level::Off,
            Level::Off => Level::On,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::On => f.write_str("ON"),
            Level::Off => f.write_str("OFF"),
        }
    }
}

/// Operating mode of a relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Manual control only
    None,
    /// Reset after consecutive failed reachability probes
    Ping,
    /// Follow a daily on/off window
    Timer,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::None => f.write_str("none"),
            Mode::Ping => f.write_str("ping"),
            Mode::Timer => f.write_str("timer"),
        }
    }
}

/// Ping mode parameters as supplied by configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingSettings {
    /// Seconds between probes
    pub interval_secs: u64,

    /// Consecutive misses that trigger a reset pulse
    pub missed_threshold: u32,

    /// How long the relay stays toggled during a reset pulse
    pub reset_duration_secs: u64,

    /// Probe target (`host:port` for TCP, URL for HTTP)
    #[serde(default = "default_target")]
    pub target: String,

    /// Probe timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_target() -> String {
    "www.google.com:443".to_string()
}

fn default_timeout_ms() -> u64 {
    3000
}

impl Default for PingSettings {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            missed_threshold: 3,
            reset_duration_secs: 5,
            target: default_target(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// One week
pub const MAX_PING_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

impl PingSettings {
    pub fn validate(&self) -> RelayResult<()> {
        if self.interval_secs == 0 {
            return Err(RelayError::invalid("ping interval must be positive"));
        }
        if self.interval_secs > MAX_PING_INTERVAL_SECS {
            return Err(RelayError::invalid(format!(
                "ping interval must be at most {} seconds",
                MAX_PING_INTERVAL_SECS
            )));
        }
        if self.missed_threshold == 0 {
            return Err(RelayError::invalid("missed ping threshold must be positive"));
        }
        if self.timeout_ms == 0 {
            return Err(RelayError::invalid("probe timeout must be positive"));
        }
        if self.target.trim().is_empty() {
            return Err(RelayError::invalid("probe target must not be empty"));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn reset_duration(&self) -> Duration {
        Duration::from_secs(self.reset_duration_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Active ping configuration together with its miss counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingConfig {
    #[serde(flatten)]
    pub settings: PingSettings,

    /// Consecutive failed probes, never above `missed_threshold`
    pub missed_count: u32,
}

impl PingConfig {
    pub fn new(settings: PingSettings) -> Self {
        Self { settings, missed_count: 0 }
    }
}

/// Daily window during which a timer-mode relay is ON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    pub on: NaiveTime,
    pub off: NaiveTime,
}

impl TimerConfig {
    pub fn new(on: NaiveTime, off: NaiveTime) -> Self {
        Self { on, off }
    }

    pub fn validate(&self) -> RelayResult<()> {
        if self.on == self.off {
            return Err(RelayError::invalid(format!(
                "timer window is empty: on and off are both {}",
                self.on
            )));
        }
        Ok(())
    }

    /// Whether `t` falls in `[on, off)`.
    ///
    /// When `on > off` the window wraps past midnight, so it covers
    /// `[on, 24:00)` and `[00:00, off)`. An `on == off` window is empty.
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.on < self.off {
            self.on <= t && t < self.off
        } else if self.on > self.off {
            t >= self.on || t < self.off
        } else {
            false
        }
    }
}

/// Mode plus the parameters that mode needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModeParams {
    #[default]
    None,
    Ping(PingSettings),
    Timer(TimerConfig),
}

impl ModeParams {
    pub fn mode(&self) -> Mode {
        match self {
            ModeParams::None => Mode::None,
            ModeParams::Ping(_) => Mode::Ping,
            ModeParams::Timer(_) => Mode::Timer,
        }
    }

    pub fn validate(&self) -> RelayResult<()> {
        match self {
            ModeParams::None => Ok(()),
            ModeParams::Ping(settings) => settings.validate(),
            ModeParams::Timer(window) => window.validate(),
        }
    }
}

/// Decision produced by a mode evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NoOp,
    SetLevel(Level),
    /// Toggle, hold for the duration, then restore
    ResetPulse(Duration),
}

/// Static description of a relay, fixed at registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayDefinition {
    pub id: RelayId,
    /// BCM pin number driving the relay
    pub pin: u8,
    pub init_level: Level,
    #[serde(default)]
    pub shutdown_level: Option<Level>,
}

/// Restore step owed by an in-flight reset pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingPulse {
    pub epoch: u64,
    pub restore: Level,
}

/// Mutable per-relay record, owned by the controller
#[derive(Debug, Clone)]
pub(crate) struct RelayState {
    pub mode: Mode,
    pub current_level: Level,
    pub init_level: Level,
    pub shutdown_level: Option<Level>,
    pub ping: Option<PingConfig>,
    pub timer: Option<TimerConfig>,
    pub last_probe_at: Option<DateTime<Utc>>,
    pub degraded: bool,
    pub pending_pulse: Option<PendingPulse>,
    pub pulse_epoch: u64,
}

impl RelayState {
    pub fn new(def: &RelayDefinition) -> Self {
        Self {
            mode: Mode::None,
            current_level: def.init_level,
            init_level: def.init_level,
            shutdown_level: def.shutdown_level,
            ping: None,
            timer: None,
            last_probe_at: None,
            degraded: false,
            pending_pulse: None,
            pulse_epoch: 0,
        }
    }

    /// Replace the configuration for `params`' mode and make it active
    pub fn apply_params(&mut self, params: ModeParams) {
        let mode = params.mode();
        match params {
            ModeParams::None => {}
            ModeParams::Ping(settings) => {
                self.ping = Some(PingConfig::new(settings));
                self.last_probe_at = None;
            }
            ModeParams::Timer(window) => self.timer = Some(window),
        }
        self.mode_changed_to(mode);
    }

    fn mode_changed_to(&mut self, mode: Mode) {
        self.mode = mode;
        self.degraded = false;
    }

    /// Activate `mode` using retained configuration
    pub fn activate(&mut self, mode: Mode) -> RelayResult<()> {
        match mode {
            Mode::None => {}
            Mode::Ping => {
                let ping = self
                    .ping
                    .as_mut()
                    .ok_or_else(|| RelayError::invalid("no ping configuration retained"))?;
                ping.missed_count = 0;
                self.last_probe_at = None;
            }
            Mode::Timer => {
                if self.timer.is_none() {
                    return Err(RelayError::invalid("no timer configuration retained"));
                }
            }
        }
        self.mode_changed_to(mode);
        Ok(())
    }

    /// Force the relay out of automatic operation after an actuator failure
    pub fn degrade(&mut self) {
        self.mode = Mode::None;
        self.degraded = true;
        self.pending_pulse = None;
    }
}

/// Consistent point-in-time view of one relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayStatus {
    pub id: RelayId,
    pub pin: u8,
    pub mode: Mode,
    pub current_level: Level,
    pub init_level: Level,
    pub shutdown_level: Option<Level>,
    pub ping: Option<PingConfig>,
    pub timer: Option<TimerConfig>,
    pub last_probe_at: Option<DateTime<Utc>>,
    pub degraded: bool,
    pub pulse_in_progress: bool,
}

impl RelayStatus {
    pub(crate) fn capture(id: RelayId, pin: u8, state: &RelayState) -> Self {
        Self {
            id,
            pin,
            mode: state.mode,
            current_level: state.current_level,
            init_level: state.init_level,
            shutdown_level: state.shutdown_level,
            ping: state.ping.clone(),
            timer: state.timer,
            last_probe_at: state.last_probe_at,
            degraded: state.degraded,
            pulse_in_progress: state.pending_pulse.is_some(),
        }
    }
}
