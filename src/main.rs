//! wellness2tcx - command-line entry point.
//!
//! Converts one MyWellness JSON export into a TCX file per invocation.

use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wellness2tcx::session::parse_start_time;
use wellness2tcx::tcx::default_output_path;
use wellness2tcx::{convert_file, load_config, ActivityType, ConvertOptions, Metric};

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert a MyWellness workout JSON export to TCX", long_about = None)]
struct Cli {
    /// Workout JSON export to convert
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output TCX path (defaults to the input path with a .tcx extension)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Workout start time, e.g. 2024-03-01T07:30 (UTC unless an offset is given)
    #[arg(long)]
    start: Option<String>,

    /// Activity type written as the TCX Sport (biking, running, other)
    #[arg(long)]
    sport: Option<ActivityType>,

    /// Series to use as the time base (speed, power, cadence, heart_rate, ...)
    #[arg(long)]
    primary: Option<Metric>,

    /// Configuration file (TOML)
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("wellness2tcx v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let start_time = cli
        .start
        .as_deref()
        .map(parse_start_time)
        .transpose()
        .context("Invalid --start value")?;

    let options = ConvertOptions {
        config,
        start_time,
        activity_type: cli.sport,
        primary: cli.primary,
    };

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    let report = convert_file(&cli.input, &output, &options)
        .with_context(|| format!("Failed to convert {}", cli.input.display()))?;

    tracing::info!(
        "Converted {} trackpoints on the {} time base",
        report.trackpoints,
        report.primary
    );
    Ok(())
}
