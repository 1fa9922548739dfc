//! Evolvable computation graphs for board-game agents.
//!
//! A [`Network`] is an arena of typed [`Node`]s connected by id. Networks are
//! evaluated in topological order with [`Network::forward`], changed in place by
//! a [`NetworkEvolver`], stored in the JSON document described in [`format`], and
//! can be relabelled under board symmetries with [`apply_symmetry`].
//!
//! ```
//! use oxo_neural::{Network, NetworkConfig, NetworkEvolver};
//! use rand::SeedableRng as _;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//! let mut network = Network::new(NetworkConfig::default(), &mut rng);
//! NetworkEvolver::default().mutate(&mut network, &mut rng);
//! let output = network.think(&[0.0; 9], &mut rng);
//! assert_eq!(output.outputs.len(), 9);
//! ```

pub use self::{
    evolver::{Bounds, MutationConfig, NetworkEvolver},
    format::{NetworkFormatError, NetworkRecord, NodeParameters, NodeRecord},
    meta::{MetaParameters, MutationCategory, PartialMetaParameters},
    network::{Connection, ForwardOutput, Network, NetworkConfig, TopologicalOrder},
    node::{Node, NodeId, NodeKind, NodeType},
    symmetry::{SymmetryError, apply_random_symmetry, apply_symmetry},
};

pub mod evolver;
pub mod format;
pub mod meta;
pub mod network;
pub mod node;
pub mod random;
pub mod symmetry;

/// Invalid configuration value.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("{field} must be non-zero")]
    ZeroSize { field: &'static str },
    #[display("{field} must be a finite range with min <= max, got [{min}, {max}]")]
    InvalidRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[display("{field} must be in [0, 1], got {value}")]
    InvalidRate { field: &'static str, value: f64 },
}
