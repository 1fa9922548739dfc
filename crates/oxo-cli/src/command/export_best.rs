use std::path::PathBuf;

use anyhow::Context;
use oxo_training::{JsonFileStore, PopulationStore as _};
use rand::SeedableRng as _;

use crate::util::Output;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ExportBestArg {
    /// Population file to read
    #[arg(long)]
    store: PathBuf,
    /// Output file for the network (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &ExportBestArg) -> anyhow::Result<()> {
    let ExportBestArg { store, output } = arg;

    let mut rng = rand::rngs::StdRng::from_os_rng();
    let saved = JsonFileStore::new(store)
        .load(&mut rng)?
        .with_context(|| format!("No population saved at {}", store.display()))?;
    let best = saved
        .population
        .iter()
        .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
        .with_context(|| format!("Population in {} is empty", store.display()))?;

    eprintln!(
        "Exporting network with fitness {:.4} ({} nodes, {} thinking iterations)",
        best.fitness(),
        best.node_count(),
        best.thinking_iterations()
    );
    Output::save_json(&best.to_record(), output.clone())?;
    Ok(())
}
