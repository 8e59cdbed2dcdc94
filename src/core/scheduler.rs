// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! Monitor scheduler - one periodic task per relay

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::controller::RelayController;
use crate::probe::Probe;
use crate::relay::{ping, Mode, RelayId};

/// Where a relay's monitor task currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonitorPhase {
    Idle,
    Scheduled,
    Evaluating,
    ResetPulseInProgress,
}

type Phases = Arc<RwLock<HashMap<RelayId, MonitorPhase>>>;

/// Drives `tick` for every relay on a fixed cadence
///
/// Each relay gets its own task, so a slow probe or a long reset pulse
/// only ever delays that relay. Relays in mode `None` stay idle until
/// they are configured.
pub struct MonitorScheduler {
    controller: Arc<RelayController>,
    probe: Arc<dyn Probe>,
    clock: Arc<dyn Clock>,
    cadence: Duration,
    shutdown_tx: broadcast::Sender<()>,
    phases: Phases,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl MonitorScheduler {
    pub fn new(
        controller: Arc<RelayController>,
        probe: Arc<dyn Probe>,
        clock: Arc<dyn Clock>,
        cadence: Duration,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let phases = controller
            .relay_ids()
            .into_iter()
            .map(|id| (id, MonitorPhase::Idle))
            .collect();

        Self {
            controller,
            probe,
            clock,
            cadence: cadence.max(Duration::from_millis(1)),
            shutdown_tx,
            phases: Arc::new(RwLock::new(phases)),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn one monitor task per relay
    pub fn start(&self) {
        let mut handles = self.handles.lock();
        if !handles.is_empty() {
            warn!("Monitor scheduler already running");
            return;
        }

        for id in self.controller.relay_ids() {
            let monitor = RelayMonitor {
                id,
                controller: self.controller.clone(),
                probe: self.probe.clone(),
                clock: self.clock.clone(),
                cadence: self.cadence,
                phases: self.phases.clone(),
            };
            let shutdown = self.shutdown_tx.subscribe();
            handles.push(tokio::spawn(monitor.run(shutdown)));
        }
        info!("Monitoring {} relays every {:?}", handles.len(), self.cadence);
    }

    pub fn is_running(&self) -> bool {
        !self.handles.lock().is_empty()
    }

    /// Current phase of a relay's monitor task
    pub fn phase(&self, id: RelayId) -> Option<MonitorPhase> {
        let phase = *self.phases.read().get(&id)?;
        if phase == MonitorPhase::Evaluating {
            if let Ok(status) = self.controller.status(id) {
                if status.pulse_in_progress {
                    return Some(MonitorPhase::ResetPulseInProgress);
                }
            }
        }
        Some(phase)
    }

    /// Stop all monitor tasks, abandoning pending ticks and pulse waits
    pub async fn shutdown(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.handles.lock());
        if handles.is_empty() {
            return;
        }
        let _ = self.shutdown_tx.send(());
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                warn!("Monitor task ended abnormally: {}", e);
            }
        }
        for phase in self.phases.write().values_mut() {
            *phase = MonitorPhase::Idle;
        }
        info!("Monitor scheduler stopped");
    }
}

struct RelayMonitor {
    id: RelayId,
    controller: Arc<RelayController>,
    probe: Arc<dyn Probe>,
    clock: Arc<dyn Clock>,
    cadence: Duration,
    phases: Phases,
}

impl RelayMonitor {
    fn set_phase(&self, phase: MonitorPhase) {
        self.phases.write().insert(self.id, phase);
    }

    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(self.cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let active = matches!(self.controller.status(self.id), Ok(s) if s.mode != Mode::None);
            self.set_phase(if active { MonitorPhase::Scheduled } else { MonitorPhase::Idle });

            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.recv() => break,
            }

            let status = match self.controller.status(self.id) {
                Ok(status) => status,
                Err(e) => {
                    warn!("Monitor for {} stopping: {}", self.id, e);
                    break;
                }
            };
            if status.mode == Mode::None {
                continue;
            }

            self.set_phase(MonitorPhase::Evaluating);
            let now = self.clock.now();

            let outcome = match (status.mode, &status.ping) {
                (Mode::Ping, Some(config)) if ping::is_due(config, status.last_probe_at, now.with_timezone(&Utc)) => {
                    let settings = &config.settings;
                    tokio::select! {
                        outcome = self.probe.probe(&settings.target, settings.timeout()) => Some(outcome),
                        _ = shutdown.recv() => break,
                    }
                }
                _ => None,
            };

            tokio::select! {
                result = self.controller.tick(self.id, now, outcome) => {
                    if let Err(e) = result {
                        debug!(relay = %self.id, error = e.as_label(), "tick failed: {}", e);
                    }
                }
                _ = shutdown.recv() => break,
            }
        }

        self.set_phase(MonitorPhase::Idle);
        debug!("Monitor for {} exited", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::SimulatedActuator;
    use crate::core::clock::AnchoredClock;
    use crate::core::controller::PulsePolicy;
    use crate::logging::MemorySink;
    use crate::probe::{ProbeOutcome, SimulatedProbe};
    use crate::relay::{Level, ModeParams, PingSettings, RelayDefinition, TimerConfig};
    use chrono::{NaiveDate, NaiveTime};

    fn setup(
        pins: &[(u32, u8)],
        probe: SimulatedProbe,
        base: (u32, u32, u32),
    ) -> (Arc<RelayController>, Arc<SimulatedActuator>, MonitorScheduler) {
        let actuator = Arc::new(SimulatedActuator::new());
        let defs = pins.iter().map(|&(id, pin)| RelayDefinition {
            id: RelayId(id),
            pin,
            init_level: Level::Off,
            shutdown_level: None,
        });
        let controller = Arc::new(
            RelayController::new(defs, actuator.clone(), Arc::new(MemorySink::new(1000)), PulsePolicy::Preempt)
                .unwrap(),
        );
        let base = NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_milli_opt(base.0, base.1, base.2, 500)
            .unwrap();
        let scheduler = MonitorScheduler::new(
            controller.clone(),
            Arc::new(probe),
            Arc::new(AnchoredClock::new(base)),
            Duration::from_millis(100),
        );
        (controller, actuator, scheduler)
    }

    fn ping(reset_secs: u64) -> ModeParams {
        ModeParams::Ping(PingSettings {
            interval_secs: 1,
            missed_threshold: 2,
            reset_duration_secs: reset_secs,
            target: "gateway:80".into(),
            timeout_ms: 500,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_relays_pulse_independently() {
        let probe = SimulatedProbe::fixed(ProbeOutcome::Unreachable);
        let (controller, actuator, scheduler) = setup(&[(1, 17), (2, 27)], probe, (12, 0, 0));
        controller.boot().await;
        controller.configure_mode(RelayId(1), ping(1)).await.unwrap();
        controller.configure_mode(RelayId(2), ping(1)).await.unwrap();

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        scheduler.shutdown().await;

        // boot, pulse toggle, pulse restore; the next pulse is not due yet
        for pin in [17, 27] {
            assert_eq!(actuator.history_for(pin), vec![Level::Off, Level::On, Level::Off]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_relay_is_not_probed() {
        let (controller, actuator, scheduler) =
            setup(&[(1, 17)], SimulatedProbe::fixed(ProbeOutcome::Unreachable), (12, 0, 0));
        scheduler.start();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(scheduler.phase(RelayId(1)), Some(MonitorPhase::Idle));
        assert!(actuator.history().is_empty());
        assert_eq!(controller.status(RelayId(1)).unwrap().last_probe_at, None);
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_relay_switches_once() {
        let (controller, actuator, scheduler) =
            setup(&[(1, 17)], SimulatedProbe::fixed(ProbeOutcome::Reachable), (7, 59, 59));
        let window = TimerConfig::new(
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        );
        controller.configure_mode(RelayId(1), ModeParams::Timer(window)).await.unwrap();

        scheduler.start();
        tokio::time::sleep(Duration::from_secs(3)).await;
        scheduler.shutdown().await;

        assert_eq!(actuator.history_for(17), vec![Level::On]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_pulse_wait() {
        let probe = SimulatedProbe::fixed(ProbeOutcome::Unreachable);
        let (controller, actuator, scheduler) = setup(&[(1, 17)], probe, (12, 0, 0));
        controller.configure_mode(RelayId(1), ping(600)).await.unwrap();

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(scheduler.phase(RelayId(1)), Some(MonitorPhase::ResetPulseInProgress));

        let start = tokio::time::Instant::now();
        scheduler.shutdown().await;
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.phase(RelayId(1)), Some(MonitorPhase::Idle));

        // left at the last commanded level
        assert_eq!(actuator.history_for(17), vec![Level::On]);
        let status = controller.status(RelayId(1)).unwrap();
        assert_eq!(status.current_level, Level::On);
        assert!(!status.pulse_in_progress);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_command_during_scheduled_pulse() {
        let probe = SimulatedProbe::fixed(ProbeOutcome::Unreachable);
        let (controller, actuator, scheduler) = setup(&[(1, 17)], probe, (12, 0, 0));
        controller.configure_mode(RelayId(1), ping(5)).await.unwrap();

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        controller.set_manual(RelayId(1), Level::On).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        scheduler.shutdown().await;

        // pulse toggle, manual ON; the preempted restore never lands
        assert_eq!(actuator.history_for(17)[..2], [Level::On, Level::On]);
        assert_eq!(controller.status(RelayId(1)).unwrap().current_level, Level::On);
    }
}
