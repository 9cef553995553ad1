//! CLI Entry Point for handedness
//!
//! Provides command-line interface for:
//! - Running a sensing session against the mock IMU or a recorded replay file
//! - Inspecting the label order resolved from model metadata
//! - Printing the effective configuration
//!
//! # Usage
//!
//! Live mock session, stop with Ctrl-C or after the configured watchdog:
//! ```bash
//! handedness run --config config/handedness.toml
//! ```
//!
//! Replay a recording as fast as possible:
//! ```bash
//! handedness run --replay recordings/session.jsonl
//! ```
//!
//! Show the label order:
//! ```bash
//! handedness labels
//! ```
//!
//! Show the effective configuration after file and environment merging:
//! ```bash
//! HANDEDNESS_SAMPLING__RATE_HZ=100 handedness config
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use handedness_sense::config::{Settings, DEFAULT_CONFIG_PATH};
use handedness_sense::labels::LabelSet;
use handedness_sense::logging::{self, OutputFormat, TracingConfig};
use handedness_sense::pipeline::HandednessPipeline;
use handedness_sense::session::run_session;
use handedness_sense::source::{MockImu, ReplaySource, SensorSource};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "handedness")]
#[command(about = "Real-time handedness classification from IMU data", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true, default_value = "compact")]
    log_format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sensing session and print each classification
    Run {
        /// Replay events from a JSON-lines file instead of the mock IMU
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Seed for the mock IMU
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Override the session watchdog (e.g. "30s", "0s" to disable)
        #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
        max_duration: Option<Duration>,
    },

    /// Print the resolved label order and where it came from
    Labels,

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;
    settings.validate()?;

    let tracing_config = TracingConfig::from_settings(&settings)
        .map_err(anyhow::Error::msg)?
        .with_format(cli.log_format);
    logging::init(tracing_config).map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Run {
            replay,
            seed,
            max_duration,
        } => run(settings, replay, seed, max_duration).await,
        Commands::Labels => print_labels(&settings),
        Commands::Config => {
            let rendered =
                toml::to_string_pretty(&settings).context("Failed to render configuration")?;
            print!("{rendered}");
            Ok(())
        }
    }
}

async fn run(
    settings: Settings,
    replay: Option<PathBuf>,
    seed: u64,
    max_duration: Option<Duration>,
) -> Result<()> {
    let (mut pipeline, mut results) = HandednessPipeline::from_settings(&settings)?;
    info!(
        labels = ?pipeline.labels().as_slice(),
        source = %pipeline.labels().source(),
        "Pipeline ready"
    );

    let printer = tokio::spawn(async move {
        while let Some(result) = results.recv().await {
            let scores: Vec<String> = result
                .confidences
                .iter()
                .map(|c| format!("{c:.2}"))
                .collect();
            println!(
                "#{:<5} {:<8} [{}]",
                result.sequence,
                result.label,
                scores.join("  ")
            );
        }
    });

    let mut source: Box<dyn SensorSource> = match &replay {
        Some(path) => Box::new(ReplaySource::open(path).await?),
        None => Box::new(MockImu::new(seed).paced()),
    };
    let max_duration = max_duration.unwrap_or(settings.session.max_duration);

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let summary = run_session(&mut pipeline, source.as_mut(), max_duration, ctrl_c).await?;

    pipeline.shutdown().await;
    if let Err(e) = printer.await {
        warn!(error = %e, "Result printer terminated abnormally");
    }

    println!();
    println!("Session ended: {:?} after {:.1?}", summary.reason, summary.elapsed);
    println!(
        "  events {}  commits {}  windows {}  dropped {}",
        summary.stats.events,
        summary.stats.commits,
        summary.stats.windows_queued,
        summary.stats.windows_dropped
    );
    Ok(())
}

fn print_labels(settings: &Settings) -> Result<()> {
    let labels = LabelSet::resolve_or_default(&settings.model.metadata_path);
    println!("Label order ({}):", labels.source());
    for (index, label) in labels.as_slice().iter().enumerate() {
        println!("  {index}: {label}");
    }
    Ok(())
}
