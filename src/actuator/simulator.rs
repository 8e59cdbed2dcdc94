// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! Simulated actuator for demo mode and testing

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;

use super::Actuator;
use crate::error::ActuatorError;
use crate::relay::Level;

/// Writes kept by [`SimulatedActuator::new`]
pub const DEFAULT_HISTORY_LIMIT: usize = 4096;

#[derive(Default)]
struct SimState {
    levels: HashMap<u8, Level>,
    history: VecDeque<(u8, Level)>,
    failing: HashSet<u8>,
}

/// In-memory output lines with a bounded command history
///
/// Lines power up OFF. Pins marked failing reject every request as
/// not present, like a relay hat that has been unplugged.
pub struct SimulatedActuator {
    state: Mutex<SimState>,
    history_limit: usize,
}

impl Default for SimulatedActuator {
    fn default() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl SimulatedActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only the latest `limit` writes
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            history_limit: limit.max(1),
        }
    }

    pub fn set_failing(&self, pin: u8, failing: bool) {
        let mut state = self.state.lock();
        if failing {
            state.failing.insert(pin);
        } else {
            state.failing.remove(&pin);
        }
    }

    /// Recent successful writes, oldest first
    pub fn history(&self) -> Vec<(u8, Level)> {
        self.state.lock().history.iter().copied().collect()
    }

    /// Recent successful writes to one pin, oldest first
    pub fn history_for(&self, pin: u8) -> Vec<Level> {
        self.state
            .lock()
            .history
            .iter()
            .filter(|(p, _)| *p == pin)
            .map(|(_, level)| *level)
            .collect()
    }

    pub fn level(&self, pin: u8) -> Level {
        self.state.lock().levels.get(&pin).copied().unwrap_or(Level::Off)
    }
}

impl Actuator for SimulatedActuator {
    fn set_level(&self, pin: u8, level: Level) -> Result<(), ActuatorError> {
        let mut state = self.state.lock();
        if state.failing.contains(&pin) {
            return Err(ActuatorError::NotPresent { pin });
        }
        state.levels.insert(pin, level);
        state.history.push_back((pin, level));
        while state.history.len() > self.history_limit {
            state.history.pop_front();
        }
        Ok(())
    }

    fn get_level(&self, pin: u8) -> Result<Level, ActuatorError> {
        let state = self.state.lock();
        if state.failing.contains(&pin) {
            return Err(ActuatorError::NotPresent { pin });
        }
        Ok(state.levels.get(&pin).copied().unwrap_or(Level::Off))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
