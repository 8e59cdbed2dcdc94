// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! Engine - builds the relay stack from configuration and runs it

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::clock::{Clock, SystemClock};
use super::controller::RelayController;
use super::scheduler::MonitorScheduler;
use crate::actuator::{Actuator, SimulatedActuator, SysfsGpio};
use crate::config::{ActuatorKind, Config, ProbeKind};
use crate::logging::{FileSink, LogSink, SinkSet, TracingSink};
use crate::probe::{Probe, SimulatedProbe, TcpProbe};
use crate::relay::{ModeParams, RelayStatus};

/// Engine-wide state
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineState {
    pub running: bool,
    pub relays: usize,
    pub degraded: usize,
    pub started_at: Option<DateTime<Local>>,
}

/// Relay controller plus its monitor scheduler, wired from a [`Config`]
pub struct Engine {
    pub config: Arc<Config>,
    controller: Arc<RelayController>,
    scheduler: MonitorScheduler,
    state: Arc<RwLock<EngineState>>,
    start_time: Option<Instant>,
}

impl Engine {
    pub async fn new(config: Config) -> Result<Self> {
        let actuator = build_actuator(&config);
        let probe = build_probe(&config)?;
        let sink = build_sink(&config)?;
        Self::with_parts(config, actuator, probe, sink, Arc::new(SystemClock))
    }

    /// Build with caller-supplied adapters
    pub fn with_parts(
        config: Config,
        actuator: Arc<dyn Actuator>,
        probe: Arc<dyn Probe>,
        sink: Arc<dyn LogSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        info!("Actuator: {}, probe: {}", actuator.name(), probe.name());
        let definitions = config.relays.iter().map(|r| r.definition());
        let controller = Arc::new(
            RelayController::new(definitions, actuator, sink, config.monitor.pulse_policy)
                .context("registering relays")?,
        );
        let scheduler = MonitorScheduler::new(
            controller.clone(),
            probe,
            clock,
            Duration::from_millis(config.monitor.cadence_ms),
        );

        Ok(Self {
            config,
            controller,
            scheduler,
            state: Arc::new(RwLock::new(EngineState::default())),
            start_time: None,
        })
    }

    /// Boot relays, apply configured modes and start monitoring
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting relay engine...");
        self.start_time = Some(Instant::now());

        self.controller.boot().await;
        for relay in &self.config.relays {
            if relay.mode == ModeParams::None {
                continue;
            }
            if let Err(e) = self.controller.configure_mode(relay.id, relay.mode.clone()).await {
                warn!("{} left in manual mode: {}", relay.id, e);
            }
        }
        self.scheduler.start();

        {
            let mut state = self.state.write().await;
            state.running = true;
            state.relays = self.config.relays.len();
            state.started_at = Some(Local::now());
        }

        info!("Relay engine started with {} relays", self.config.relays.len());
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping relay engine...");
        self.scheduler.shutdown().await;
        self.controller.apply_shutdown_levels().await;

        {
            let mut state = self.state.write().await;
            state.running = false;
        }

        info!("Relay engine stopped");
        Ok(())
    }

    pub async fn state(&self) -> EngineState {
        let mut state = self.state.read().await.clone();
        state.degraded = self.controller.statuses().iter().filter(|s| s.degraded).count();
        state
    }

    pub fn controller(&self) -> Arc<RelayController> {
        self.controller.clone()
    }

    pub fn scheduler(&self) -> &MonitorScheduler {
        &self.scheduler
    }

    pub fn statuses(&self) -> Vec<RelayStatus> {
        self.controller.statuses()
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }
}

fn build_actuator(config: &Config) -> Arc<dyn Actuator> {
    if config.demo_mode {
        return Arc::new(SimulatedActuator::new());
    }
    let actuator: Arc<dyn Actuator> = match config.actuator.kind {
        ActuatorKind::Sysfs => Arc::new(SysfsGpio::new(&config.actuator.gpio_root, config.actuator.active_low)),
        ActuatorKind::Simulated => Arc::new(SimulatedActuator::new()),
    };
    actuator
}

fn build_probe(config: &Config) -> Result<Arc<dyn Probe>> {
    let simulated = || Arc::new(SimulatedProbe::random(config.probe.simulated_failure_ratio)) as Arc<dyn Probe>;
    if config.demo_mode {
        return Ok(simulated());
    }
    let probe: Arc<dyn Probe> = match config.probe.kind {
        ProbeKind::Tcp => Arc::new(TcpProbe::new()),
        #[cfg(feature = "http")]
        ProbeKind::Http => Arc::new(crate::probe::HttpProbe::new()?),
        #[cfg(not(feature = "http"))]
        ProbeKind::Http => anyhow::bail!("http probe needs the `http` feature"),
        ProbeKind::Simulated => simulated(),
    };
    Ok(probe)
}

fn build_sink(config: &Config) -> Result<Arc<dyn LogSink>> {
    let mut sinks = SinkSet::new().with(Arc::new(TracingSink::new()));
    if let Some(path) = &config.log.file {
        let file = FileSink::open(path, config.log.level, config.log.categories.iter().copied(), config.log.format)
            .with_context(|| format!("opening log file {:?}", path))?;
        info!("Logging relay events to {:?}", file.path());
        sinks = sinks.with(Arc::new(file));
    }
    Ok(Arc::new(sinks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::core::AnchoredClock;
    use crate::logging::{Category, MemorySink};
    use crate::probe::ProbeOutcome;
    use crate::relay::{Level, Mode, PingSettings, RelayId};
    use chrono::NaiveDate;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.log.file = None;
        config.monitor.cadence_ms = 100;
        config.relays = vec![
            RelayConfig {
                id: RelayId(1),
                pin: 17,
                init_level: Level::On,
                shutdown_level: Some(Level::Off),
                mode: ModeParams::Ping(PingSettings {
                    interval_secs: 1,
                    missed_threshold: 1,
                    reset_duration_secs: 2,
                    ..PingSettings::default()
                }),
            },
            RelayConfig {
                id: RelayId(2),
                pin: 27,
                init_level: Level::Off,
                shutdown_level: None,
                mode: ModeParams::None,
            },
        ];
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_lifecycle() {
        let actuator = Arc::new(SimulatedActuator::new());
        let log = Arc::new(MemorySink::new(1000));
        let base = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
        let mut engine = Engine::with_parts(
            test_config(),
            actuator.clone(),
            Arc::new(SimulatedProbe::fixed(ProbeOutcome::Unreachable)),
            log.clone(),
            Arc::new(AnchoredClock::new(base)),
        )
        .unwrap();

        engine.start().await.unwrap();
        assert!(engine.state().await.running);
        assert_eq!(engine.statuses()[0].mode, Mode::Ping);
        assert_eq!(engine.statuses()[1].mode, Mode::None);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        engine.controller().set_manual(RelayId(2), Level::On).await.unwrap();
        engine.stop().await.unwrap();

        let state = engine.state().await;
        assert!(!state.running);
        assert_eq!(state.degraded, 0);
        // boot ON, pulse OFF, shutdown level OFF
        assert_eq!(actuator.history_for(17), vec![Level::On, Level::Off, Level::Off]);
        assert_eq!(actuator.history_for(27), vec![Level::Off, Level::On]);
        assert!(!log.by_category(Category::Reset).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = test_config();
        config.relays[1].id = RelayId(1);
        let result = Engine::with_parts(
            config,
            Arc::new(SimulatedActuator::new()),
            Arc::new(SimulatedProbe::fixed(ProbeOutcome::Reachable)),
            Arc::new(MemorySink::new(10)),
            Arc::new(SystemClock),
        );
        assert!(result.is_err());
    }
}
