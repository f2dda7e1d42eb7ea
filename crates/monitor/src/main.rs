//! Driving Behavior Monitor - Main Entry Point

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use monitor::{init_logging, run, MonitorConfig};
use tokio::io::BufReader;
use tracing::info;

/// Replays a recorded driving session and prints detected events as JSON lines
#[derive(Parser, Debug)]
#[command(name = "driving-monitor", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Publish records as fast as they are read instead of at recorded pace
    #[arg(long)]
    fast: bool,

    /// Replay file (newline-delimited JSON); reads stdin when omitted
    input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config =
        MonitorConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if args.fast {
        config.replay.fast = true;
    }
    init_logging(&config.logging);

    info!("=== Driving Behavior Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let stdout = tokio::io::stdout();
    let summary = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            run(&config, BufReader::new(file), stdout).await?
        }
        None => run(&config, BufReader::new(tokio::io::stdin()), stdout).await?,
    };

    info!(
        "Replay finished: {} records, {} skipped, {} events",
        summary.records, summary.skipped, summary.events
    );
    Ok(())
}
