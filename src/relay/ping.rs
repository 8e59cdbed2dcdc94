// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! Ping mode evaluator
//!
//! Counts consecutive failed probes and asks for a reset pulse once the
//! threshold is reached. The evaluator never probes or mutates anything
//! itself: the controller supplies the outcome and writes the decision back.
//!
//! Probe times are UTC so the interval does not stretch or shrink when the
//! local clock changes offset.

use chrono::{DateTime, Utc};

use super::{Action, PingConfig};
use crate::probe::ProbeOutcome;

/// Result of one ping evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingDecision {
    pub action: Action,
    /// Miss counter after this evaluation
    pub missed_count: u32,
    /// Set when a probe outcome was consumed
    pub probed_at: Option<DateTime<Utc>>,
}

/// Whether a probe is due at `now`
///
/// A clock that stepped back past the last probe makes the probe due
/// immediately, so monitoring re-anchors instead of waiting out the step.
pub fn is_due(config: &PingConfig, last_probe_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    let Some(last) = last_probe_at else {
        return true;
    };
    let elapsed = now.signed_duration_since(last);
    if elapsed < chrono::Duration::zero() {
        return true;
    }
    match chrono::Duration::from_std(config.settings.interval()) {
        Ok(interval) => elapsed >= interval,
        Err(_) => false,
    }
}

pub fn evaluate(
    config: &PingConfig,
    last_probe_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    outcome: Option<&ProbeOutcome>,
) -> PingDecision {
    let idle = PingDecision {
        action: Action::NoOp,
        missed_count: config.missed_count,
        probed_at: None,
    };

    if !is_due(config, last_probe_at, now) {
        return idle;
    }
    let Some(outcome) = outcome else {
        return idle;
    };

    if outcome.is_reachable() {
        return PingDecision {
            action: Action::NoOp,
            missed_count: 0,
            probed_at: Some(now),
        };
    }

    let missed = config.missed_count.saturating_add(1);
    if missed >= config.settings.missed_threshold {
        PingDecision {
            action: Action::ResetPulse(config.settings.reset_duration()),
            missed_count: 0,
            probed_at: Some(now),
        }
    } else {
        PingDecision {
            action: Action::NoOp,
            missed_count: missed,
            probed_at: Some(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::PingSettings;
    use chrono::{Duration, TimeZone};
    use std::time::Duration as StdDuration;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn config(threshold: u32) -> PingConfig {
        PingConfig::new(PingSettings {
            interval_secs: 10,
            missed_threshold: threshold,
            reset_duration_secs: 5,
            ..PingSettings::default()
        })
    }

    /// Feed outcomes `spacing` seconds apart, writing decisions back like the controller does
    fn run(config: &mut PingConfig, outcomes: &[ProbeOutcome], spacing: i64) -> Vec<Action> {
        let mut last = None;
        let mut actions = vec![];
        for (i, outcome) in outcomes.iter().enumerate() {
            let now = at(i as i64 * spacing);
            let decision = evaluate(config, last, now, Some(outcome));
            config.missed_count = decision.missed_count;
            if decision.probed_at.is_some() {
                last = decision.probed_at;
            }
            assert!(config.missed_count <= config.settings.missed_threshold);
            actions.push(decision.action);
        }
        actions
    }

    #[test]
    fn test_not_due_is_noop() {
        let cfg = config(3);
        let decision = evaluate(&cfg, Some(at(0)), at(9), Some(&ProbeOutcome::Unreachable));
        assert_eq!(decision.action, Action::NoOp);
        assert_eq!(decision.missed_count, 0);
        assert!(decision.probed_at.is_none());
    }

    #[test]
    fn test_due_without_outcome_consumes_nothing() {
        let cfg = config(3);
        let decision = evaluate(&cfg, None, at(0), None);
        assert_eq!(decision.action, Action::NoOp);
        assert!(decision.probed_at.is_none());
    }

    #[test]
    fn test_three_misses_trigger_one_pulse() {
        let mut cfg = config(3);
        let actions = run(&mut cfg, &vec![ProbeOutcome::Unreachable; 3], 10);
        assert_eq!(
            actions,
            vec![Action::NoOp, Action::NoOp, Action::ResetPulse(StdDuration::from_secs(5))]
        );
        assert_eq!(cfg.missed_count, 0);
    }

    #[test]
    fn test_reachable_resets_count() {
        let mut cfg = config(3);
        let outcomes = [
            ProbeOutcome::Unreachable,
            ProbeOutcome::Unreachable,
            ProbeOutcome::Reachable,
            ProbeOutcome::Unreachable,
        ];
        let actions = run(&mut cfg, &outcomes, 10);
        assert!(actions.iter().all(|a| *a == Action::NoOp));
        assert_eq!(cfg.missed_count, 1);
    }

    #[test]
    fn test_probe_error_counts_as_miss() {
        let mut cfg = config(2);
        let outcomes = [
            ProbeOutcome::Error("dns lookup failed".into()),
            ProbeOutcome::Unreachable,
        ];
        let actions = run(&mut cfg, &outcomes, 10);
        assert!(matches!(actions[1], Action::ResetPulse(_)));
    }

    #[test]
    fn test_outcomes_inside_interval_are_ignored() {
        let mut cfg = config(3);
        // 5s spacing with a 10s interval: only every other outcome is consumed
        let actions = run(&mut cfg, &vec![ProbeOutcome::Unreachable; 5], 5);
        assert_eq!(actions.iter().filter(|a| matches!(a, Action::ResetPulse(_))).count(), 1);
        assert!(matches!(actions[4], Action::ResetPulse(_)));
    }

    #[test]
    fn test_clock_stepped_back_is_due() {
        let cfg = config(3);
        let last = at(3600);
        assert!(is_due(&cfg, Some(last), at(60)));
        assert!(!is_due(&cfg, Some(last), at(3605)));

        let decision = evaluate(&cfg, Some(last), at(60), Some(&ProbeOutcome::Unreachable));
        assert_eq!(decision.missed_count, 1);
        assert_eq!(decision.probed_at, Some(at(60)));
    }

    #[test]
    fn test_longest_interval_is_not_always_due() {
        let mut cfg = config(3);
        cfg.settings.interval_secs = crate::relay::MAX_PING_INTERVAL_SECS;
        assert!(!is_due(&cfg, Some(at(0)), at(86_400)));

        cfg.settings.interval_secs = u64::MAX;
        assert!(!is_due(&cfg, Some(at(0)), at(86_400)));
    }
}
