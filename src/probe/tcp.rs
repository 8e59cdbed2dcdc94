// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! TCP connect probe

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::{timeout_at, Instant};
use tracing::trace;

use super::{Probe, ProbeOutcome};

/// Considers a `host:port` target reachable once a TCP handshake completes
///
/// Name resolution failures are reported as [`ProbeOutcome::Error`] so a
/// broken resolver can be told apart from a dead uplink.
#[derive(Debug, Default, Clone)]
pub struct TcpProbe;

impl TcpProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn probe(&self, target: &str, timeout: Duration) -> ProbeOutcome {
        let deadline = Instant::now() + timeout;

        let addrs: Vec<_> = match timeout_at(deadline, lookup_host(target)).await {
            Err(_) => return ProbeOutcome::Unreachable,
            Ok(Err(e)) => return ProbeOutcome::Error(format!("resolve {target}: {e}")),
            Ok(Ok(addrs)) => addrs.collect(),
        };
        if addrs.is_empty() {
            return ProbeOutcome::Error(format!("resolve {target}: no addresses"));
        }

        for addr in addrs {
            match timeout_at(deadline, TcpStream::connect(addr)).await {
                Ok(Ok(_)) => return ProbeOutcome::Reachable,
                Ok(Err(e)) => trace!("connect {} failed: {}", addr, e),
                Err(_) => break,
            }
        }
        ProbeOutcome::Unreachable
    }

    fn name(&self) -> &str {
        "tcp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_listening_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let outcome = TcpProbe::new().probe(&addr, Duration::from_secs(2)).await;
        assert_eq!(outcome, ProbeOutcome::Reachable);
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        let outcome = TcpProbe::new().probe(&addr, Duration::from_secs(2)).await;
        assert_eq!(outcome, ProbeOutcome::Unreachable);
    }

    #[tokio::test]
    async fn test_malformed_target_is_error() {
        let outcome = TcpProbe::new().probe("missing-port", Duration::from_secs(2)).await;
        assert!(matches!(outcome, ProbeOutcome::Error(_)));
    }
}
