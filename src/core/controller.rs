// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! Relay controller - owns relay state and applies mode decisions
//!
//! Every relay has two locks. The async action lock serialises whole
//! mutation sequences (manual commands, ticks, reset pulses). The state
//! lock is held only for short synchronous sections, so snapshots never
//! wait behind a pulse and never see half-applied updates.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as ActionLock, MutexGuard};
use tracing::{debug, warn};

use crate::actuator::Actuator;
use crate::error::{RelayError, RelayResult};
use crate::logging::{Category, LogRecord, LogSink, Severity};
use crate::probe::ProbeOutcome;
use crate::relay::{
    ping, timer, Action, Level, Mode, ModeParams, PendingPulse, RelayDefinition, RelayId, RelayState,
    RelayStatus,
};

/// What a manual command does to a reset pulse that is still running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PulsePolicy {
    /// The command waits until the pulse has restored its level, then applies
    Queue,
    /// The command applies at once and the pulse skips its restore step
    #[default]
    Preempt,
}

struct RelaySlot {
    id: RelayId,
    pin: u8,
    action: ActionLock<()>,
    state: parking_lot::Mutex<RelayState>,
}

/// Clears a pulse's pending restore when the pulse future is dropped early
///
/// A cancelled pulse leaves the relay at the toggled level; nothing is
/// owed afterwards, so later commands must not see it as in progress.
struct AbandonPulse<'a> {
    slot: &'a RelaySlot,
    epoch: u64,
}

impl Drop for AbandonPulse<'_> {
    fn drop(&mut self) {
        let mut state = self.slot.state.lock();
        if state.pending_pulse.map(|pulse| pulse.epoch) == Some(self.epoch) {
            state.pending_pulse = None;
            debug!("{}: reset pulse {} abandoned at {}", self.slot.id, self.epoch, state.current_level);
        }
    }
}

/// Supervises every registered relay
pub struct RelayController {
    relays: BTreeMap<RelayId, Arc<RelaySlot>>,
    actuator: Arc<dyn Actuator>,
    sink: Arc<dyn LogSink>,
    policy: PulsePolicy,
}

impl RelayController {
    /// Register relays; ids must be unique
    pub fn new(
        definitions: impl IntoIterator<Item = RelayDefinition>,
        actuator: Arc<dyn Actuator>,
        sink: Arc<dyn LogSink>,
        policy: PulsePolicy,
    ) -> RelayResult<Self> {
        let mut relays = BTreeMap::new();
        let mut pins: HashMap<u8, RelayId> = HashMap::new();

        for def in definitions {
            if relays.contains_key(&def.id) {
                return Err(RelayError::invalid(format!("duplicate relay id {}", def.id)));
            }
            if let Some(other) = pins.insert(def.pin, def.id) {
                warn!("{} and {} share gpio pin {}", other, def.id, def.pin);
            }
            let slot = RelaySlot {
                id: def.id,
                pin: def.pin,
                action: ActionLock::new(()),
                state: parking_lot::Mutex::new(RelayState::new(&def)),
            };
            relays.insert(def.id, Arc::new(slot));
        }

        Ok(Self {
            relays,
            actuator,
            sink,
            policy,
        })
    }

    pub fn policy(&self) -> PulsePolicy {
        self.policy
    }

    pub fn relay_ids(&self) -> Vec<RelayId> {
        self.relays.keys().copied().collect()
    }

    fn slot(&self, id: RelayId) -> RelayResult<&Arc<RelaySlot>> {
        self.relays.get(&id).ok_or(RelayError::UnknownRelay(id))
    }

    fn log(&self, severity: Severity, category: Category, relay: RelayId, message: impl Into<String>) {
        self.sink.record(&LogRecord::new(severity, category, Some(relay), message));
    }

    /// Drive one pin and record the new level, degrading the relay on failure
    fn drive(&self, slot: &RelaySlot, level: Level) -> RelayResult<()> {
        match self.actuator.set_level(slot.pin, level) {
            Ok(()) => {
                slot.state.lock().current_level = level;
                Ok(())
            }
            Err(source) => {
                slot.state.lock().degrade();
                self.log(
                    Severity::Error,
                    Category::Error,
                    slot.id,
                    format!("failed to drive pin {} {}: {}; automatic mode disabled", slot.pin, level, source),
                );
                Err(RelayError::ActuatorUnavailable { relay: slot.id, source })
            }
        }
    }

    /// Drive every relay to its initial level
    pub async fn boot(&self) {
        for slot in self.relays.values() {
            let _guard = slot.action.lock().await;
            let level = slot.state.lock().init_level;
            if self.drive(slot, level).is_ok() {
                self.log(
                    Severity::Info,
                    Category::Boot,
                    slot.id,
                    format!("booted on pin {} at {}", slot.pin, level),
                );
            }
        }
    }

    /// Cancel pending restores and apply configured shutdown levels
    pub async fn apply_shutdown_levels(&self) {
        for slot in self.relays.values() {
            let _guard = slot.action.lock().await;
            let shutdown_level = {
                let mut state = slot.state.lock();
                state.pending_pulse = None;
                state.shutdown_level
            };
            if let Some(level) = shutdown_level {
                if self.drive(slot, level).is_ok() {
                    self.log(Severity::Info, Category::Boot, slot.id, format!("shutdown level {}", level));
                }
            }
        }
    }

    /// Replace the parameters of a mode and make it active
    pub async fn configure_mode(&self, id: RelayId, params: ModeParams) -> RelayResult<()> {
        let slot = self.slot(id)?;
        if let Err(e) = params.validate() {
            self.log(Severity::Warning, Category::Error, id, format!("rejected {} configuration: {}", params.mode(), e));
            return Err(e);
        }

        let _guard = slot.action.lock().await;
        let mode = params.mode();
        slot.state.lock().apply_params(params);
        self.log(Severity::Info, Category::Received, id, format!("mode configured: {}", mode));
        Ok(())
    }

    /// Re-activate a mode using its retained parameters
    pub async fn switch_mode(&self, id: RelayId, mode: Mode) -> RelayResult<()> {
        let slot = self.slot(id)?;
        let _guard = slot.action.lock().await;
        slot.state.lock().activate(mode)?;
        self.log(Severity::Info, Category::Received, id, format!("mode switched: {}", mode));
        Ok(())
    }

    /// Manual override; allowed in every mode
    pub async fn set_manual(&self, id: RelayId, level: Level) -> RelayResult<()> {
        let slot = self.slot(id)?;
        let _guard = slot.action.lock().await;
        self.apply_manual(slot, level)
    }

    /// Manual override to the opposite of the level read back from the pin
    pub async fn toggle(&self, id: RelayId) -> RelayResult<Level> {
        let slot = self.slot(id)?;
        let _guard = slot.action.lock().await;
        let level = self.read_back(slot)?.toggled();
        self.apply_manual(slot, level)?;
        Ok(level)
    }

    /// Read the pin and resync the recorded level, degrading the relay on failure
    fn read_back(&self, slot: &RelaySlot) -> RelayResult<Level> {
        match self.actuator.get_level(slot.pin) {
            Ok(level) => {
                let mut state = slot.state.lock();
                if state.current_level != level {
                    debug!("{}: pin {} reads {}, recorded {}", slot.id, slot.pin, level, state.current_level);
                    state.current_level = level;
                }
                Ok(level)
            }
            Err(source) => {
                slot.state.lock().degrade();
                self.log(
                    Severity::Error,
                    Category::Error,
                    slot.id,
                    format!("failed to read pin {}: {}; automatic mode disabled", slot.pin, source),
                );
                Err(RelayError::ActuatorUnavailable { relay: slot.id, source })
            }
        }
    }

    /// Manual override of every relay, in id order
    pub async fn set_all(&self, level: Level) -> Vec<(RelayId, RelayResult<()>)> {
        let mut results = Vec::with_capacity(self.relays.len());
        for id in self.relay_ids() {
            results.push((id, self.set_manual(id, level).await));
        }
        results
    }

    fn apply_manual(&self, slot: &RelaySlot, level: Level) -> RelayResult<()> {
        // a pulse still pending here was preempted; its restore must not undo this command
        let preempted = slot.state.lock().pending_pulse.take();
        if let Some(pulse) = preempted {
            self.log(
                Severity::Warning,
                Category::Reset,
                slot.id,
                format!("manual {} preempts reset pulse, restore to {} skipped", level, pulse.restore),
            );
        }
        self.drive(slot, level)?;
        self.log(Severity::Info, Category::Received, slot.id, format!("manual override: {}", level));
        Ok(())
    }

    /// Run the active mode's evaluator and apply its decision
    ///
    /// Timer windows follow the local time of day in `now`; ping intervals
    /// follow its UTC instant.
    pub async fn tick(&self, id: RelayId, now: DateTime<FixedOffset>, outcome: Option<ProbeOutcome>) -> RelayResult<Action> {
        let slot = self.slot(id)?;
        let guard = slot.action.lock().await;

        let action = {
            let mut state = slot.state.lock();
            let state = &mut *state;
            match state.mode {
                Mode::None => Action::NoOp,
                Mode::Ping => match state.ping.as_mut() {
                    Some(config) => {
                        let decision =
                            ping::evaluate(config, state.last_probe_at, now.with_timezone(&Utc), outcome.as_ref());
                        config.missed_count = decision.missed_count;
                        if decision.probed_at.is_some() {
                            state.last_probe_at = decision.probed_at;
                            if let Some(outcome) = &outcome {
                                let missed = match decision.action {
                                    Action::ResetPulse(_) => config.settings.missed_threshold,
                                    _ => decision.missed_count,
                                };
                                self.log_probe(slot.id, &config.settings.target, outcome, missed, config.settings.missed_threshold);
                            }
                        }
                        decision.action
                    }
                    None => Action::NoOp,
                },
                Mode::Timer => match &state.timer {
                    Some(window) => timer::evaluate(window, now.time(), state.current_level),
                    None => Action::NoOp,
                },
            }
        };

        match action {
            Action::NoOp => {}
            Action::SetLevel(level) => {
                self.drive(slot, level)?;
                self.log(Severity::Info, Category::Received, id, format!("timer window: switched {}", level));
            }
            Action::ResetPulse(duration) => self.pulse(slot, guard, duration).await?,
        }
        Ok(action)
    }

    fn log_probe(&self, id: RelayId, target: &str, outcome: &ProbeOutcome, missed: u32, threshold: u32) {
        match outcome {
            ProbeOutcome::Reachable => {
                self.log(Severity::Info, Category::Connection, id, format!("{} reachable", target))
            }
            ProbeOutcome::Unreachable => self.log(
                Severity::Warning,
                Category::Connection,
                id,
                format!("{} unreachable ({}/{} missed)", target, missed, threshold),
            ),
            ProbeOutcome::Error(e) => self.log(
                Severity::Error,
                Category::Connection,
                id,
                format!("probe of {} failed: {} ({}/{} missed)", target, e, missed, threshold),
            ),
        }
    }

    /// Toggle, wait, restore. Holds the action lock per the pulse policy.
    async fn pulse(&self, slot: &RelaySlot, guard: MutexGuard<'_, ()>, duration: Duration) -> RelayResult<()> {
        let (restore, epoch) = {
            let mut state = slot.state.lock();
            state.pulse_epoch += 1;
            (state.current_level, state.pulse_epoch)
        };

        self.drive(slot, restore.toggled())?;
        slot.state.lock().pending_pulse = Some(PendingPulse { epoch, restore });
        let _abandon = AbandonPulse { slot, epoch };
        self.log(
            Severity::Warning,
            Category::Reset,
            slot.id,
            format!("reset pulse: {} for {}s, then {}", restore.toggled(), duration.as_secs(), restore),
        );

        match self.policy {
            PulsePolicy::Queue => {
                tokio::time::sleep(duration).await;
                let result = self.finish_pulse(slot, epoch);
                drop(guard);
                result
            }
            PulsePolicy::Preempt => {
                drop(guard);
                tokio::time::sleep(duration).await;
                let _guard = slot.action.lock().await;
                self.finish_pulse(slot, epoch)
            }
        }
    }

    fn finish_pulse(&self, slot: &RelaySlot, epoch: u64) -> RelayResult<()> {
        let pending = {
            let mut state = slot.state.lock();
            if state.pending_pulse.map(|pulse| pulse.epoch) == Some(epoch) {
                state.pending_pulse.take()
            } else {
                None
            }
        };

        match pending {
            Some(pulse) => {
                self.drive(slot, pulse.restore)?;
                self.log(
                    Severity::Info,
                    Category::Reset,
                    slot.id,
                    format!("reset pulse complete, restored {}", pulse.restore),
                );
            }
            None => debug!("{}: reset pulse {} was preempted", slot.id, epoch),
        }
        Ok(())
    }

    /// Point-in-time snapshot of one relay
    pub fn status(&self, id: RelayId) -> RelayResult<RelayStatus> {
        let slot = self.slot(id)?;
        let state = slot.state.lock();
        Ok(RelayStatus::capture(slot.id, slot.pin, &state))
    }

    /// Snapshots of all relays, in id order
    pub fn statuses(&self) -> Vec<RelayStatus> {
        self.relays
            .values()
            .map(|slot| RelayStatus::capture(slot.id, slot.pin, &slot.state.lock()))
            .collect()
    }
}
