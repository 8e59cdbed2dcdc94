// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! Timer mode evaluator

use chrono::NaiveTime;

use super::{Action, Level, TimerConfig};

/// Level the window asks for at `now`
pub fn desired_level(window: &TimerConfig, now: NaiveTime) -> Level {
    if window.contains(now) {
        Level::On
    } else {
        Level::Off
    }
}

/// Switch only when the desired level differs from the current one
pub fn evaluate(window: &TimerConfig, now: NaiveTime, current: Level) -> Action {
    let desired = desired_level(window, now);
    if desired == current {
        Action::NoOp
    } else {
        Action::SetLevel(desired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_daytime_window() {
        let window = TimerConfig::new(hm(8, 0), hm(18, 0));
        assert_eq!(desired_level(&window, hm(8, 0)), Level::On);
        assert_eq!(desired_level(&window, hm(12, 0)), Level::On);
        assert_eq!(desired_level(&window, hm(18, 0)), Level::Off);
        assert_eq!(desired_level(&window, hm(7, 59)), Level::Off);
    }

    #[test]
    fn test_window_wraps_past_midnight() {
        let window = TimerConfig::new(hm(22, 0), hm(6, 0));
        assert_eq!(desired_level(&window, hm(23, 30)), Level::On);
        assert_eq!(desired_level(&window, hm(2, 0)), Level::On);
        assert_eq!(desired_level(&window, hm(12, 0)), Level::Off);
        assert_eq!(desired_level(&window, hm(6, 0)), Level::Off);
        assert_eq!(desired_level(&window, hm(22, 0)), Level::On);
    }

    #[test]
    fn test_empty_window_rejected_and_off() {
        let window = TimerConfig::new(hm(9, 0), hm(9, 0));
        assert!(window.validate().is_err());
        assert_eq!(desired_level(&window, hm(9, 0)), Level::Off);
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let window = TimerConfig::new(hm(8, 0), hm(18, 0));
        assert_eq!(evaluate(&window, hm(9, 0), Level::Off), Action::SetLevel(Level::On));
        assert_eq!(evaluate(&window, hm(9, 0), Level::On), Action::NoOp);
        assert_eq!(evaluate(&window, hm(19, 0), Level::Off), Action::NoOp);
    }
}
