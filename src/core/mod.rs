//! Core module - relay controller, monitor scheduler and engine wiring

mod clock;
mod controller;
mod engine;
mod scheduler;

pub use clock::{AnchoredClock, Clock, SystemClock};
pub use controller::{PulsePolicy, RelayController};
pub use engine::{Engine, EngineState};
pub use scheduler::{MonitorPhase, MonitorScheduler};
