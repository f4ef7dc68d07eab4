//! FES session runner
//!
//! Runs a stride-based stimulation session against the simulated
//! stimulator and writes the stimulation record, or summarises a record
//! written earlier.
//!
//! # Usage
//!
//! ```bash
//! # Ten seconds with the default configuration
//! fes-session run --duration 10
//!
//! # Explicit configuration and output path
//! fes-session run --config fes.toml --output walk.fesl
//!
//! # Summarise a record
//! fes-session inspect walk.fesl
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossbeam::channel::bounded;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use gait_fes_core::config::ConfigLoader;
use gait_fes_core::session::{run_session, StimulationSession};
use gait_fes_core::simulation::SyntheticGaitSource;
use gait_fes_core::stimlog::EventLog;
use gait_fes_core::utils::SystemTimeProvider;

/// Gait-synchronised FES session runner
#[derive(Parser, Debug)]
#[command(name = "fes-session")]
#[command(author, version, about = "Gait-synchronised FES session runner", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a session on synthetic gait data
    Run {
        /// Configuration file; defaults to fes.toml and fes.local.toml when present
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run time in seconds; runs until interrupted when omitted
        #[arg(short, long)]
        duration: Option<f64>,

        /// Where to write the stimulation record; overrides session.log_path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Amplitude of the synthetic sensor noise
        #[arg(long, default_value = "0.05")]
        noise: f64,

        /// Seed for a reproducible synthetic stream
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Summarise a persisted stimulation record
    Inspect {
        /// Record written by `run`
        log: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{}", gait_fes_core::NAME, gait_fes_core::VERSION);

    match cli.command {
        Commands::Run { config, duration, output, noise, seed } => run(config, duration, output, noise, seed),
        Commands::Inspect { log } => inspect(&log),
    }
}

fn run(
    config_path: Option<PathBuf>,
    duration: Option<f64>,
    output: Option<PathBuf>,
    noise: f64,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let loader = match &config_path {
        Some(path) => ConfigLoader::from_file(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load().context("loading configuration")?;

    let run_for = duration.map(parse_run_time).transpose()?;

    let mut session = StimulationSession::from_config(&config, Arc::new(SystemTimeProvider))
        .context("building stimulation session")?;
    let mut source = match seed {
        Some(seed) => SyntheticGaitSource::seeded(config.gait.clone(), noise, seed),
        None => SyntheticGaitSource::new(config.gait.clone(), noise),
    };

    // The sender stays alive for the whole run; dropping it stops the loop.
    let (_stop_tx, stop_rx) = bounded::<()>(1);
    let period = Duration::from_millis(config.session.tick_period_ms);
    let summary = run_session(&mut session, &mut source, period, run_for, &stop_rx)?;

    let path = output.unwrap_or_else(|| config.session.log_path.clone());
    let log = session.log().snapshot();
    log.save(&path).with_context(|| format!("writing {}", path.display()))?;

    println!("ticks:        {}", summary.ticks);
    println!("transitions:  {}", summary.transitions);
    println!("tick errors:  {}", summary.errors);
    println!("overruns:     {}", summary.overruns);
    println!("events:       {}", log.len());
    println!("record:       {}", path.display());
    Ok(())
}

fn parse_run_time(secs: f64) -> anyhow::Result<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        anyhow::bail!("duration must be a positive number of seconds, got {secs}");
    }
    match Duration::try_from_secs_f64(secs) {
        Ok(run_for) => Ok(run_for),
        Err(e) => anyhow::bail!("duration {secs} s is not representable: {e}"),
    }
}

fn inspect(path: &Path) -> anyhow::Result<()> {
    let log = EventLog::load(path).with_context(|| format!("reading {}", path.display()))?;

    let closed = log.events().iter().filter(|e| !e.is_open()).count();
    println!("record:   {}", path.display());
    println!("events:   {} ({} closed)", log.len(), closed);
    println!("pending:  {}", if log.has_pending() { "yes" } else { "no" });

    if !log.has_data() {
        return Ok(());
    }

    let durations = log.duration_series();
    let total: f64 = durations.sum();
    println!("on time:  {:.3} s", total);
    if let Some(last) = log.elapsed_times().iter().last() {
        println!("last at:  {:.3} s", last);
    }

    let amplitudes = log.amplitude_matrix();
    for (row, series) in amplitudes.outer_iter().enumerate() {
        let delivered: Vec<f64> = series.iter().copied().filter(|a| a.is_finite() && *a > 0.0).collect();
        if delivered.is_empty() {
            println!("row {}: never stimulated", row + 1);
            continue;
        }
        let max = delivered.iter().copied().fold(f64::MIN, f64::max);
        let mean = delivered.iter().sum::<f64>() / delivered.len() as f64;
        println!(
            "row {}: {} events, mean {:.1} mA, max {:.1} mA",
            row + 1,
            delivered.len(),
            mean,
            max
        );
    }
    Ok(())
}
