//! quotebook simulation - Entry Point
//!
//! Runs the market-making engine against a seeded random walk and reports
//! per-instrument statistics.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use quotebook_bot::{AppConfig, Application};
use quotebook_telemetry::Metrics;

/// Seeded market-making simulation
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "QUOTEBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Override the number of simulation steps
    #[arg(long)]
    steps: Option<usize>,

    /// Override the RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Print every trade as a JSON line after the run
    #[arg(long)]
    dump_trades: bool,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    metrics: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    quotebook_telemetry::init_logging()?;

    info!("Starting quotebook simulation v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(steps) = args.steps {
        config.simulation.steps = steps;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    info!(
        steps = config.simulation.steps,
        seed = config.simulation.seed,
        "Configuration loaded"
    );

    let mut app = Application::new(config)?;
    let outcome = app.run()?;
    outcome.reporter.output_summary();

    if args.dump_trades {
        for record in app.trade_history() {
            println!("{}", serde_json::to_string(record)?);
        }
    }

    if args.metrics {
        print!("{}", Metrics::encode_text()?);
    }

    Ok(())
}
