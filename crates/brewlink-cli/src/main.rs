//! BrewLink - Main entry point
//!
//! Identifies a BrewPi-style controller on a serial port and reports its
//! firmware version and hardware capabilities.

mod config;

use anyhow::{Context, Result};
use brewlink_core::ControllerInfo;
use brewlink_handshake::{request_version_with, HandshakeError, SerialTransport};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "brewlink")]
#[command(about = "BrewPi controller handshake and identification tool")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "brewlink.toml")]
    config: PathBuf,

    /// Serial port the controller is attached to (overrides the config file)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate (overrides the config file)
    #[arg(short, long)]
    baud: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

/// Result record emitted by `--json`
#[derive(Debug, Serialize)]
struct IdentifyReport {
    identified_at: DateTime<Utc>,
    port: String,
    retries: u32,
    elapsed_ms: u128,
    controller: ControllerInfo,
    description: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("BrewLink v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = config::load_config(&args.config)?;

    // CLI flags override the file
    if let Some(port) = args.port {
        config.serial.port = port;
    }
    if let Some(baud) = args.baud {
        config.serial.baud = baud;
    }

    info!(
        port = %config.serial.port,
        baud = config.serial.baud,
        "Opening serial link"
    );

    let mut transport = SerialTransport::open(&config.serial.port, config.serial.baud)
        .with_context(|| format!("Failed to open serial port {}", config.serial.port))?;

    match request_version_with(&mut transport, &config.to_handshake_config()).await {
        Ok(report) => {
            if args.json {
                let report = IdentifyReport {
                    identified_at: Utc::now(),
                    port: config.serial.port.clone(),
                    retries: report.retries,
                    elapsed_ms: report.elapsed.as_millis(),
                    description: report.info.extended_description(),
                    controller: report.info,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.info.extended_description());
                println!("  Version: {}", report.info.version_string());
                if report.info.board.is_some() {
                    println!("  Board:   {}", report.info.full_name());
                }
                if let Some(shield) = report.info.shield {
                    println!("  Shield:  {}", shield.name());
                }
                if let Some(commit) = &report.info.commit {
                    println!("  Commit:  {}", commit);
                }
                println!("  Retries: {}", report.retries);
            }
            Ok(())
        }
        Err(HandshakeError::NoResponse { retries, elapsed }) => {
            anyhow::bail!(
                "No version reply from {} after {} retries ({:.1?})",
                config.serial.port,
                retries,
                elapsed
            )
        }
        Err(err) => Err(err).context("Version handshake failed"),
    }
}
