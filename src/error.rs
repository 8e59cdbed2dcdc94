// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! Error types for relay control and the actuator layer

use thiserror::Error;

use crate::relay::RelayId;

/// Errors surfaced by the relay controller
#[derive(Debug, Error)]
pub enum RelayError {
    /// Mode parameters or relay definitions were rejected; state is unchanged
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The relay id was never registered
    #[error("unknown relay {0}")]
    UnknownRelay(RelayId),

    /// The actuator could not drive the relay's pin; the relay is now degraded
    #[error("relay {relay} actuator unavailable: {source}")]
    ActuatorUnavailable {
        relay: RelayId,
        #[source]
        source: ActuatorError,
    },
}

impl RelayError {
    /// Short stable label for log fields
    pub fn as_label(&self) -> &'static str {
        match self {
            RelayError::InvalidConfiguration(_) => "invalid_configuration",
            RelayError::UnknownRelay(_) => "unknown_relay",
            RelayError::ActuatorUnavailable { .. } => "actuator_unavailable",
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        RelayError::InvalidConfiguration(msg.into())
    }
}

/// Failures reported by an [`Actuator`](crate::actuator::Actuator)
#[derive(Debug, Error)]
pub enum ActuatorError {
    /// No line exists for this pin (hardware absent or pin unexported)
    #[error("gpio pin {pin} not present")]
    NotPresent { pin: u8 },

    /// Reading or writing the line failed
    #[error("gpio pin {pin} i/o failed: {source}")]
    Io {
        pin: u8,
        #[source]
        source: std::io::Error,
    },

    /// The line reported something other than 0 or 1
    #[error("gpio pin {pin} returned unexpected value {value:?}")]
    InvalidValue { pin: u8, value: String },
}

impl ActuatorError {
    /// Pin the failure refers to
    pub fn pin(&self) -> u8 {
        match self {
            ActuatorError::NotPresent { pin }
            | ActuatorError::Io { pin, .. }
            | ActuatorError::InvalidValue { pin, .. } => *pin,
        }
    }
}

/// Result alias for controller operations
pub type RelayResult<T> = std::result::Result<T, RelayError>;
