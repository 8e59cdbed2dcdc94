//! Probe module - remote reachability checks

#[cfg(feature = "http")]
mod http;
mod simulator;
mod tcp;

#[cfg(feature = "http")]
pub use http::HttpProbe;
pub use simulator::SimulatedProbe;
pub use tcp::TcpProbe;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

/// Result of a single reachability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    /// The target did not answer in time or refused the connection
    Unreachable,
    /// The probe itself could not run (bad target, DNS failure)
    Error(String),
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Reachable => f.write_str("reachable"),
            ProbeOutcome::Unreachable => f.write_str("unreachable"),
            ProbeOutcome::Error(e) => write!(f, "probe error: {e}"),
        }
    }
}

/// Reachability check against a remote target
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, target: &str, timeout: Duration) -> ProbeOutcome;

    /// Short name for logs
    fn name(&self) -> &str;
}
