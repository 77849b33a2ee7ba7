//! Scenario runner (cadence-ap) - Main entry point
//!
//! Runs a scripted session against the simulated host platform and logs
//! every engine event. Used as a manual smoke test of the engine.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cadence_ap::config::AppConfig;
use cadence_ap::scenario::Scenario;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for cadence-ap
#[derive(Parser, Debug)]
#[command(name = "cadence-ap")]
#[command(about = "Run a scripted session against the simulated audio host")]
#[command(version)]
struct Args {
    /// Scenario file (TOML)
    #[arg(short, long)]
    scenario: PathBuf,

    /// Engine config file (TOML); falls back to CADENCE_CONFIG, then the
    /// platform config directory
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // RUST_LOG wins over the config file
    let default_filter = format!("cadence_ap={}", config.logging.level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("Failed to load scenario {}", args.scenario.display()))?;

    info!(
        "Running {} ({} steps)",
        args.scenario.display(),
        scenario.steps.len()
    );

    let report = scenario.run(config.engine).await;

    for event in &report.events {
        info!("{}", serde_json::to_string(event).context("Failed to serialize event")?);
    }
    for url in &report.music_ended {
        info!("Music ended: {}", url);
    }
    info!("Final status: {:?}", report.final_status);
    if let Some(message) = report.final_status.error_message() {
        info!("Final error: {}", message);
    }

    Ok(())
}
