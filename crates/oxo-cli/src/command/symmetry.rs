use std::path::PathBuf;

use anyhow::Context;
use oxo_engine::Symmetry;
use oxo_neural::Network;
use rand::{RngCore, SeedableRng as _};

use crate::util::{self, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SymmetryArg {
    /// Network file to transform
    file: PathBuf,
    /// Board symmetry, e.g. `rotate90` or `flip-main-diagonal` (random when omitted)
    #[arg(long, value_parser = parse_symmetry)]
    symmetry: Option<Symmetry>,
    /// Output file for the transformed network (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Seed for the random symmetry
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_symmetry(name: &str) -> anyhow::Result<Symmetry> {
    let normalized = name.replace(['-', '_'], "");
    Symmetry::ALL
        .into_iter()
        .find(|s| s.to_string().eq_ignore_ascii_case(&normalized))
        .with_context(|| {
            let names = Symmetry::ALL.map(|s| s.to_string()).join(", ");
            format!("unknown symmetry `{name}` (expected one of {names})")
        })
}

pub(crate) fn run(arg: &SymmetryArg) -> anyhow::Result<()> {
    let SymmetryArg {
        file,
        symmetry,
        output,
        seed,
    } = arg;

    let mut rng = seed.map_or_else(
        rand::rngs::StdRng::from_os_rng,
        rand::rngs::StdRng::seed_from_u64,
    );
    let mut network = util::read_network_file(file, &mut rng)?;
    let applied = transform(&mut network, *symmetry, &mut rng)
        .with_context(|| format!("Cannot transform {}", file.display()))?;
    eprintln!("Applied {applied} to {}", file.display());
    Output::save_json(&network.to_record(), output.clone())?;
    Ok(())
}

fn transform(
    network: &mut Network,
    symmetry: Option<Symmetry>,
    rng: &mut dyn RngCore,
) -> anyhow::Result<Symmetry> {
    match symmetry {
        Some(symmetry) => {
            oxo_neural::apply_symmetry(network, symmetry)?;
            Ok(symmetry)
        }
        None => Ok(oxo_neural::apply_random_symmetry(network, rng)?),
    }
}
