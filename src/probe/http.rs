// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! HTTP GET probe

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::{Probe, ProbeOutcome};

/// Considers a URL reachable when any HTTP response comes back
///
/// Targets without a scheme are fetched over https.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("relaywatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn url(target: &str) -> String {
        if target.contains("://") {
            target.to_string()
        } else {
            format!("https://{target}")
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, target: &str, timeout: Duration) -> ProbeOutcome {
        let url = Self::url(target);
        match self.client.get(&url).timeout(timeout).send().await {
            Ok(_) => ProbeOutcome::Reachable,
            Err(e) if e.is_timeout() || e.is_connect() => ProbeOutcome::Unreachable,
            Err(e) => ProbeOutcome::Error(format!("GET {url}: {e}")),
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
