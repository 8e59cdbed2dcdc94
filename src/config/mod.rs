// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! Configuration module

use anyhow::{anyhow, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::actuator::DEFAULT_GPIO_ROOT;
use crate::core::PulsePolicy;
use crate::logging::{Category, LogFormat, Severity};
use crate::relay::{Level, ModeParams, PingSettings, RelayDefinition, RelayId, TimerConfig};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Application version
    pub version: String,

    /// Enable demo mode (simulated GPIO and probe)
    #[serde(default)]
    pub demo_mode: bool,

    /// Relay event log
    #[serde(default)]
    pub log: LogConfig,

    /// Monitor loop configuration
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// GPIO backend
    #[serde(default)]
    pub actuator: ActuatorConfig,

    /// Reachability probe backend
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Relays, registered in this order
    #[serde(default)]
    pub relays: Vec<RelayConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "RelayWatch".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            demo_mode: false,
            log: LogConfig::default(),
            monitor: MonitorConfig::default(),
            actuator: ActuatorConfig::default(),
            probe: ProbeConfig::default(),
            relays: default_relays(),
        }
    }
}

/// Four-channel relay hat: relay 1 watches the uplink, relay 2 runs office hours
fn default_relays() -> Vec<RelayConfig> {
    let office_hours = TimerConfig::new(
        NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
        NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
    );
    vec![
        RelayConfig::new(1, 22, ModeParams::Ping(PingSettings::default())),
        RelayConfig::new(2, 27, ModeParams::Timer(office_hours)),
        RelayConfig::new(3, 17, ModeParams::None),
        RelayConfig::new(4, 4, ModeParams::None),
    ]
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Check relay ids and mode parameters
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for relay in &self.relays {
            if !ids.insert(relay.id) {
                return Err(anyhow!("duplicate relay id {}", relay.id));
            }
            relay
                .mode
                .validate()
                .map_err(|e| anyhow!("{}: {}", relay.id, e))?;
        }
        if self.monitor.cadence_ms == 0 {
            return Err(anyhow!("monitor cadence must be positive"));
        }
        if !(0.0..=1.0).contains(&self.probe.simulated_failure_ratio) {
            return Err(anyhow!("simulated failure ratio must be within 0..=1"));
        }
        Ok(())
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("relaywatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Relay event log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log file; no file sink when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Minimum severity written to the file
    pub level: Severity,

    /// Event categories written to the file
    pub categories: Vec<Category>,

    /// Line format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("relay.txt")),
            level: Severity::Info,
            categories: Category::ALL.to_vec(),
            format: LogFormat::Text,
        }
    }
}

/// Monitor loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Evaluation cadence per relay in milliseconds
    pub cadence_ms: u64,

    /// How manual commands interact with a running reset pulse
    #[serde(default)]
    pub pulse_policy: PulsePolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cadence_ms: 1000,
            pulse_policy: PulsePolicy::Preempt,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorKind {
    Sysfs,
    Simulated,
}

/// GPIO backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorConfig {
    pub kind: ActuatorKind,

    /// sysfs GPIO root
    pub gpio_root: PathBuf,

    /// Relay board closes on a low line
    #[serde(default)]
    pub active_low: bool,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            kind: ActuatorKind::Sysfs,
            gpio_root: PathBuf::from(DEFAULT_GPIO_ROOT),
            active_low: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Tcp,
    Http,
    Simulated,
}

/// Reachability probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub kind: ProbeKind,

    /// Share of simulated probes that fail
    #[serde(default = "default_failure_ratio")]
    pub simulated_failure_ratio: f64,
}

fn default_failure_ratio() -> f64 {
    0.2
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            kind: ProbeKind::Tcp,
            simulated_failure_ratio: default_failure_ratio(),
        }
    }
}

/// One relay as written in the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub id: RelayId,

    /// BCM pin number
    pub pin: u8,

    pub init_level: Level,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown_level: Option<Level>,

    /// Mode applied at startup
    #[serde(default)]
    pub mode: ModeParams,
}

impl RelayConfig {
    pub fn new(id: u32, pin: u8, mode: ModeParams) -> Self {
        Self {
            id: RelayId(id),
            pin,
            init_level: Level::Off,
            shutdown_level: None,
            mode,
        }
    }

    pub fn definition(&self) -> RelayDefinition {
        RelayDefinition {
            id: self.id,
            pin: self.pin,
            init_level: self.init_level,
            shutdown_level: self.shutdown_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::Mode;

    #[test]
    fn test_default_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::parse(&text).unwrap();
        assert_eq!(parsed.relays, config.relays);
        assert_eq!(parsed.relays[0].mode.mode(), Mode::Ping);
        assert_eq!(parsed.monitor.pulse_policy, PulsePolicy::Preempt);
    }

    #[test]
    fn test_parse_hand_written() {
        let text = r#"
            app_name = "RelayWatch"
            version = "1.0.0"

            [monitor]
            cadence_ms = 500
            pulse_policy = "queue"

            [[relays]]
            id = 1
            pin = 17
            init_level = "on"
            shutdown_level = "off"
            mode = { kind = "ping", interval_secs = 30, missed_threshold = 4, reset_duration_secs = 10 }

            [[relays]]
            id = 2
            pin = 27
            init_level = "off"
            mode = { kind = "timer", on = "22:00:00", off = "06:00:00" }
        "#;
        let config = Config::parse(text).unwrap();
        assert_eq!(config.monitor.pulse_policy, PulsePolicy::Queue);
        assert_eq!(config.relays.len(), 2);
        match &config.relays[0].mode {
            ModeParams::Ping(p) => {
                assert_eq!(p.missed_threshold, 4);
                assert_eq!(p.target, "www.google.com:443");
            }
            other => panic!("unexpected mode {:?}", other),
        }
        assert_eq!(config.relays[0].shutdown_level, Some(Level::Off));
        assert_eq!(config.log.categories.len(), 5);
    }

    #[test]
    fn test_rejects_unknown_mode() {
        let text = r#"
            app_name = "RelayWatch"
            version = "1.0.0"

            [[relays]]
            id = 1
            pin = 17
            init_level = "off"
            mode = { kind = "sometimes" }
        "#;
        assert!(Config::parse(text).is_err());
    }

    #[test]
    fn test_rejects_invalid_relays() {
        let mut config = Config::default();
        config.relays[1].id = RelayId(1);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.relays[0].mode = ModeParams::Ping(PingSettings {
            interval_secs: 0,
            ..PingSettings::default()
        });
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.relays[0].mode = ModeParams::Ping(PingSettings {
            interval_secs: u64::MAX,
            ..PingSettings::default()
        });
        assert!(config.validate().is_err());
    }
}
