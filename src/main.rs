use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use episcope_lib::models::TelemetryDocument;
use episcope_lib::quality::evaluate;
use episcope_lib::{logging, ConfigStore, ViewerConfig};

/// Judge one recorded episode from its telemetry and print the verdict as JSON.
#[derive(Parser, Debug)]
#[command(name = "episcope", version, about, long_about = None)]
struct Cli {
    /// Telemetry file: a sample array or an episode document
    telemetry: PathBuf,

    /// Episode duration in seconds; overrides the document's own
    #[arg(short, long)]
    duration: Option<f64>,

    /// Viewer configuration file supplying the quality thresholds
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigStore::new(path.clone())?.config(),
        None => ViewerConfig::from_env(),
    };

    let raw = fs::read_to_string(&cli.telemetry)
        .with_context(|| format!("Failed to read telemetry from {}", cli.telemetry.display()))?;
    let document: TelemetryDocument = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid telemetry in {}", cli.telemetry.display()))?;

    let duration = cli
        .duration
        .or_else(|| document.duration())
        .context("--duration is required when the file is a bare sample array")?;

    let verdict = evaluate(document.telemetry(), duration, &config.quality);
    info!(
        "{} samples judged {} ({} criteria met)",
        document.telemetry().len(),
        verdict.label.as_str(),
        verdict.criteria_met
    );

    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}
