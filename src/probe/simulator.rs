// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! Simulated probe for demo mode and testing

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::prelude::*;

use super::{Probe, ProbeOutcome};

enum Fallback {
    Fixed(ProbeOutcome),
    Random { failure_ratio: f64 },
}

/// Probed targets remembered by [`SimulatedProbe::calls`]
const CALL_LIMIT: usize = 1024;

struct SimState {
    script: VecDeque<ProbeOutcome>,
    fallback: Fallback,
    calls: VecDeque<String>,
}

/// Probe that replays scripted outcomes, then falls back to a fixed or random one
pub struct SimulatedProbe {
    state: Mutex<SimState>,
    latency: Duration,
}

impl SimulatedProbe {
    /// Always return `outcome`
    pub fn fixed(outcome: ProbeOutcome) -> Self {
        Self::with_fallback(Fallback::Fixed(outcome))
    }

    /// Fail with probability `failure_ratio` (clamped to `0..=1`)
    pub fn random(failure_ratio: f64) -> Self {
        Self::with_fallback(Fallback::Random {
            failure_ratio: failure_ratio.clamp(0.0, 1.0),
        })
    }

    fn with_fallback(fallback: Fallback) -> Self {
        Self {
            state: Mutex::new(SimState {
                script: VecDeque::new(),
                fallback,
                calls: VecDeque::new(),
            }),
            latency: Duration::ZERO,
        }
    }

    /// Queue outcomes returned before the fallback kicks in
    pub fn script(self, outcomes: impl IntoIterator<Item = ProbeOutcome>) -> Self {
        self.state.lock().script.extend(outcomes);
        self
    }

    /// Simulated round-trip time, capped by the caller's timeout
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Most recently probed targets, oldest first
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.iter().cloned().collect()
    }

    fn next_outcome(&self, target: &str) -> ProbeOutcome {
        let mut state = self.state.lock();
        state.calls.push_back(target.to_string());
        if state.calls.len() > CALL_LIMIT {
            state.calls.pop_front();
        }
        if let Some(outcome) = state.script.pop_front() {
            return outcome;
        }
        match &state.fallback {
            Fallback::Fixed(outcome) => outcome.clone(),
            Fallback::Random { failure_ratio } => {
                if thread_rng().gen_bool(*failure_ratio) {
                    ProbeOutcome::Unreachable
                } else {
                    ProbeOutcome::Reachable
                }
            }
        }
    }
}

#[async_trait]
impl Probe for SimulatedProbe {
    async fn probe(&self, target: &str, timeout: Duration) -> ProbeOutcome {
        let outcome = self.next_outcome(target);
        if !self.latency.is_zero() {
            if self.latency >= timeout {
                tokio::time::sleep(timeout).await;
                return ProbeOutcome::Unreachable;
            }
            tokio::time::sleep(self.latency).await;
        }
        outcome
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
