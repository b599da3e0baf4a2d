//! # MHS Transport
//!
//! Entry point: parse arguments, initialise logging, load configuration,
//! run until Ctrl+C.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use mhs_telemetry::{init_logging, TelemetryConfig};
use transport_runtime::{TransportConfig, TransportRuntime};

/// Reliable ebXML and DTS message transport
#[derive(Parser, Debug)]
#[command(name = "transport-runtime")]
#[command(about = "ForwardExpress and DTS message handling service")]
struct Args {
    /// TOML configuration file (camelCase keys). Defaults apply when omitted.
    #[arg(short, long, env = "MHS_CONFIG")]
    config: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<TransportConfig> {
    let config = match &args.config {
        Some(path) => TransportConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => TransportConfig::default(),
    };
    Ok(config.with_env_overrides())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&TelemetryConfig::from_env()).context("Failed to initialise logging")?;

    let config = load_config(&args)?;
    let mut runtime = TransportRuntime::new(config).context("Invalid configuration")?;
    runtime.start();

    info!("Transport is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;

    Ok(())
}
