use std::path::PathBuf;

use anyhow::Context;
use oxo_training::{JsonFileStore, TrainingConfig, TrainingManager};
use rand::SeedableRng as _;

use crate::util;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ImportArg {
    /// Population file to add the networks to
    #[arg(long)]
    store: PathBuf,
    /// Network files to import
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Population size used when the store does not exist yet
    #[arg(long)]
    population_size: Option<usize>,
    /// Seed for the population created when the store does not exist yet
    #[arg(long)]
    seed: Option<u64>,
}

pub(crate) fn run(arg: &ImportArg) -> anyhow::Result<()> {
    let ImportArg {
        store,
        files,
        population_size,
        seed,
    } = arg;

    let mut config = TrainingConfig::default();
    if let Some(size) = population_size {
        config.genetic.population_size = *size;
    }
    let mut manager =
        TrainingManager::create_or_load(config, Box::new(JsonFileStore::new(store)), *seed)
            .with_context(|| format!("Failed to open population {}", store.display()))?;

    let mut rng = rand::rngs::StdRng::from_os_rng();
    for path in files {
        let network = util::read_network_file(path, &mut rng)?;
        manager
            .import_network(network)
            .with_context(|| format!("Failed to import {}", path.display()))?;
        eprintln!("Imported {}", path.display());
    }

    manager
        .save()
        .with_context(|| format!("Failed to save population {}", store.display()))?;
    eprintln!(
        "Population {} now holds {} networks",
        store.display(),
        manager.population().len()
    );
    Ok(())
}
