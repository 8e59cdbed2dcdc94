// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! Linux sysfs GPIO actuator

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use super::Actuator;
use crate::error::ActuatorError;
use crate::relay::Level;

/// Default sysfs GPIO root on a Raspberry Pi
pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

/// Drives relay pins through `/sys/class/gpio`
///
/// Pins are exported and switched to output on first use. Many relay
/// boards energise the coil on a low line; `active_low` inverts the
/// written value so `Level::On` always means "relay closed".
pub struct SysfsGpio {
    root: PathBuf,
    active_low: bool,
    prepared: Mutex<HashSet<u8>>,
}

impl SysfsGpio {
    pub fn new(root: impl Into<PathBuf>, active_low: bool) -> Self {
        Self {
            root: root.into(),
            active_low,
            prepared: Mutex::new(HashSet::new()),
        }
    }

    fn pin_dir(&self, pin: u8) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }

    fn prepare(&self, pin: u8) -> Result<PathBuf, ActuatorError> {
        let dir = self.pin_dir(pin);
        let mut prepared = self.prepared.lock();
        if prepared.contains(&pin) {
            return Ok(dir);
        }

        if !dir.exists() {
            let export = self.root.join("export");
            if !export.exists() {
                return Err(ActuatorError::NotPresent { pin });
            }
            write(pin, &export, &pin.to_string())?;
            if !dir.exists() {
                return Err(ActuatorError::NotPresent { pin });
            }
            debug!("Exported gpio{}", pin);
        }

        write(pin, &dir.join("direction"), "out")?;
        prepared.insert(pin);
        Ok(dir)
    }

    fn encode(&self, level: Level) -> &'static str {
        match (level, self.active_low) {
            (Level::On, false) | (Level::Off, true) => "1",
            (Level::Off, false) | (Level::On, true) => "0",
        }
    }

    fn decode(&self, pin: u8, raw: &str) -> Result<Level, ActuatorError> {
        let high = match raw.trim() {
            "1" => true,
            "0" => false,
            other => {
                return Err(ActuatorError::InvalidValue {
                    pin,
                    value: other.to_string(),
                })
            }
        };
        Ok(if high != self.active_low { Level::On } else { Level::Off })
    }
}

fn write(pin: u8, path: &Path, value: &str) -> Result<(), ActuatorError> {
    fs::write(path, value).map_err(|source| ActuatorError::Io { pin, source })
}

impl Actuator for SysfsGpio {
    fn set_level(&self, pin: u8, level: Level) -> Result<(), ActuatorError> {
        let dir = self.prepare(pin)?;
        write(pin, &dir.join("value"), self.encode(level))
    }

    fn get_level(&self, pin: u8) -> Result<Level, ActuatorError> {
        let dir = self.prepare(pin)?;
        let raw = fs::read_to_string(dir.join("value"))
            .map_err(|source| ActuatorError::Io { pin, source })?;
        self.decode(pin, &raw)
    }

    fn name(&self) -> &str {
        "sysfs"
    }
}
