use std::path::PathBuf;

use anyhow::Context;
use oxo_training::{JsonFileStore, TrainingConfig, TrainingManager, TrainingMode};
use tracing::{info, warn};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Population file to resume from and save to
    #[arg(long, default_value = "population.json")]
    store: PathBuf,
    /// Number of networks in the population
    #[arg(long)]
    population_size: Option<usize>,
    /// Run battles back to back instead of sleeping between them
    #[arg(long)]
    full_speed: bool,
    /// Stop after this many generations (runs until Ctrl-C when omitted)
    #[arg(long)]
    generations: Option<u64>,
    /// Ignore any saved population and start over
    #[arg(long)]
    reset: bool,
    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

pub(crate) async fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let TrainArg {
        store,
        population_size,
        full_speed,
        generations,
        reset,
        seed,
    } = arg;

    let mut config = TrainingConfig::default();
    if let Some(size) = population_size {
        config.genetic.population_size = *size;
    }
    if *full_speed {
        config.mode = TrainingMode::FullSpeed;
    }

    let population_store = Box::new(JsonFileStore::new(store));
    let manager = if *reset {
        TrainingManager::new(config, Some(population_store), *seed)
    } else {
        TrainingManager::create_or_load(config, population_store, *seed)
    };
    let manager =
        manager.with_context(|| format!("Failed to prepare training with {}", store.display()))?;

    eprintln!(
        "Training {} networks (generation {}, store {})",
        manager.population().len(),
        manager.stats().generation,
        store.display()
    );
    let handle = manager.spawn(*generations);

    let control = handle.control();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, stopping after the current battle");
                control.stop();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    let manager = handle.join().await.context("Training task failed")?;
    let stats = manager.stats();
    eprintln!();
    eprintln!("Training stopped after {:.1?}", stats.elapsed());
    eprintln!("  Battles:         {}", stats.battle_count);
    eprintln!("  Generation:      {}", stats.generation);
    eprintln!("  Best fitness:    {:.4}", stats.best_fitness);
    eprintln!("  Average fitness: {:.4}", stats.average_fitness);
    eprintln!(
        "  Avg game length: {:.2}",
        stats.average_game_length.value()
    );
    Ok(())
}
