//! riskguard - automated risk-control daemon.
//!
//! Watches an externally-supplied trading account and, when risk
//! conditions are breached, force-closes positions and temporarily
//! disables automated order submission.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Automated risk-control daemon
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via RISKGUARD_CONFIG)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    riskguard_telemetry::init_logging()?;

    info!("Starting riskguard v{}", env!("CARGO_PKG_VERSION"));

    // Determine config path: CLI arg > RISKGUARD_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("RISKGUARD_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = if std::path::Path::new(&config_path).exists() {
        riskguard_daemon::AppConfig::from_file(&config_path)?
    } else {
        tracing::warn!(path = %config_path, "Config file not found, using defaults");
        riskguard_daemon::AppConfig::default()
    };

    let app = riskguard_daemon::Application::new(config)?;
    app.run().await?;

    Ok(())
}
