// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/relaywatch-rs

//! RelayWatch - GPIO relay supervisor
//!
//! Runs headless: boots every configured relay, starts the monitors and
//! waits for Ctrl+C before applying shutdown levels.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use relaywatch::logging::{Category, Severity};
use relaywatch::{build_info, Config, Engine, NAME, VERSION};

/// RelayWatch - GPIO relay supervisor
#[derive(Parser, Debug)]
#[command(name = "relaywatch")]
#[command(author = "RelayWatch Project")]
#[command(version = VERSION)]
#[command(about = "Power-cycle and schedule GPIO relays")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Demo mode with simulated GPIO and probes
    #[arg(long)]
    demo: bool,

    /// Relay event log file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Minimum severity written to the event log
    #[arg(long)]
    log_level: Option<String>,

    /// Event categories written to the event log (comma separated)
    #[arg(long, value_delimiter = ',')]
    log_types: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let info = build_info();
    info!("{} v{} ({}/{})", NAME, VERSION, info.os, info.target);
    if !info.features.is_empty() {
        info!("   Features: {}", info.features.join(", "));
    }

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;
    apply_overrides(&mut config, &args)?;

    info!("Configuration loaded from {:?}", config_path);
    info!("Demo mode: {}", config.demo_mode);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_headless(config))
}

/// Command line flags win over the configuration file
fn apply_overrides(config: &mut Config, args: &Args) -> Result<()> {
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(path) = &args.log_file {
        config.log.file = Some(path.clone());
    }
    if let Some(level) = &args.log_level {
        config.log.level = level.parse::<Severity>().map_err(|e| anyhow!(e))?;
    }
    if !args.log_types.is_empty() {
        config.log.categories = args
            .log_types
            .iter()
            .map(|t| t.parse::<Category>().map_err(|e| anyhow!(e)))
            .collect::<Result<_>>()?;
    }
    Ok(())
}

async fn run_headless(config: Config) -> Result<()> {
    let mut engine = Engine::new(config).await?;
    engine.start().await?;

    info!("RelayWatch running");
    info!("   Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received, cleaning up...");
    engine.stop().await?;

    for status in engine.statuses() {
        info!("{}", serde_json::to_string(&status)?);
    }
    info!("Uptime: {}s", engine.uptime());
    info!("RelayWatch shutdown complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from([
            "relaywatch",
            "--demo",
            "--log-file",
            "/tmp/relays.log",
            "--log-level",
            "warn",
            "--log-types",
            "reset,error",
        ]);
        let mut config = Config::default();
        apply_overrides(&mut config, &args).unwrap();
        assert!(config.demo_mode);
        assert_eq!(config.log.file, Some(PathBuf::from("/tmp/relays.log")));
        assert_eq!(config.log.level, Severity::Warning);
        assert_eq!(config.log.categories, vec![Category::Reset, Category::Error]);
    }

    #[test]
    fn test_bad_log_type_rejected() {
        let args = Args::parse_from(["relaywatch", "--log-types", "sometimes"]);
        assert!(apply_overrides(&mut Config::default(), &args).is_err());
    }
}
