//! Actuator module - binary output lines driving the relays

mod simulator;
mod sysfs;

pub use simulator::SimulatedActuator;
pub use sysfs::{SysfsGpio, DEFAULT_GPIO_ROOT};

use crate::error::ActuatorError;
use crate::relay::Level;

/// A set of binary output lines addressed by pin number
pub trait Actuator: Send + Sync {
    /// Drive `pin` to `level`
    fn set_level(&self, pin: u8, level: Level) -> Result<(), ActuatorError>;

    /// Read back the level currently on `pin`; manual toggles start from it
    fn get_level(&self, pin: u8) -> Result<Level, ActuatorError>;

    /// Short name for logs
    fn name(&self) -> &str;
}
