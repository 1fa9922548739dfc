use clap::{Parser, Subcommand};
use tracing::info;

use self::{
    benchmark::BenchmarkArg, export_best::ExportBestArg, import::ImportArg,
    symmetry::SymmetryArg, train::TrainArg,
};

mod benchmark;
mod export_best;
mod import;
mod symmetry;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log filter used when `RUST_LOG` is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// What to run
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Run continuous self-play training
    Train(#[clap(flatten)] TrainArg),
    /// Write the fittest network of a saved population
    ExportBest(#[clap(flatten)] ExportBestArg),
    /// Add network files to a saved population
    Import(#[clap(flatten)] ImportArg),
    /// Play a network against the fixed agents and tactical positions
    Benchmark(#[clap(flatten)] BenchmarkArg),
    /// Rewire a network under a board symmetry
    Symmetry(#[clap(flatten)] SymmetryArg),
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

pub async fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_tracing(&args.log_level);
    info!(log_level = %args.log_level, "Tracing initialized");

    match args.mode {
        Mode::Train(arg) => train::run(&arg).await?,
        Mode::ExportBest(arg) => export_best::run(&arg)?,
        Mode::Import(arg) => import::run(&arg)?,
        Mode::Benchmark(arg) => benchmark::run(&arg)?,
        Mode::Symmetry(arg) => symmetry::run(&arg)?,
    }
    Ok(())
}
