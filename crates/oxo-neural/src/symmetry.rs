//! Relabels a network's I/O wiring under a board symmetry.
//!
//! For a symmetry `s`, the transformed network `n'` satisfies
//! `n'.forward(s(x)) == s(n.forward(x))`: whatever read input cell `i` now reads
//! cell `s(i)`, and the logic that produced output `i` now produces output
//! `s(i)`. Hidden topology is untouched.

use std::collections::BTreeMap;

use oxo_engine::{BOARD_SIZE, Symmetry};
use rand::{Rng, seq::IndexedRandom as _};

use crate::{
    network::Network,
    node::{NodeId, NodeType},
};

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("board symmetries need 9 inputs and 9 outputs, got {input_size} and {output_size}")]
pub struct SymmetryError {
    pub input_size: usize,
    pub output_size: usize,
}

/// Rewires `network` under `symmetry` in place.
pub fn apply_symmetry(network: &mut Network, symmetry: Symmetry) -> Result<(), SymmetryError> {
    let config = *network.config();
    if config.input_size != BOARD_SIZE || config.output_size != BOARD_SIZE {
        return Err(SymmetryError {
            input_size: config.input_size,
            output_size: config.output_size,
        });
    }
    if symmetry.is_identity() {
        return Ok(());
    }

    let input_ids = network.input_node_ids().to_vec();
    let output_ids = network.output_node_ids().to_vec();
    let input_remap = input_ids
        .iter()
        .enumerate()
        .map(|(cell, id)| (id.clone(), input_ids[symmetry.map_cell(cell)].clone()))
        .collect::<BTreeMap<_, _>>();

    for node in network.nodes_mut() {
        if node.node_type() == NodeType::Input {
            continue;
        }
        for input in node.inputs_mut() {
            if let Some(mapped) = input_remap.get(input) {
                *input = mapped.clone();
            }
        }
    }

    let mut rewired: Vec<Vec<NodeId>> = vec![vec![]; output_ids.len()];
    for (cell, id) in output_ids.iter().enumerate() {
        if let Some(node) = network.node(id) {
            rewired[symmetry.map_cell(cell)] = node.inputs().to_vec();
        }
    }
    for (id, inputs) in output_ids.iter().zip(rewired) {
        if let Some(node) = network.node_mut(id) {
            *node.inputs_mut() = inputs;
        }
    }

    network.update_topological_order();
    Ok(())
}

/// Applies a uniformly chosen symmetry (possibly the identity) and returns it.
pub fn apply_random_symmetry<R>(
    network: &mut Network,
    rng: &mut R,
) -> Result<Symmetry, SymmetryError>
where
    R: Rng + ?Sized,
{
    let symmetry = *Symmetry::ALL.choose(rng).unwrap_or(&Symmetry::Identity);
    apply_symmetry(network, symmetry)?;
    Ok(symmetry)
}
