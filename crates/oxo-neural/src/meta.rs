//! Self-adaptive mutation parameters carried by every network.

use std::ops::Range;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A category of mutation with its own probability and magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum MutationCategory {
    #[display("weights")]
    Weights,
    #[display("constants")]
    Constants,
    #[display("thinkingIterations")]
    ThinkingIterations,
    #[display("add_node")]
    AddNode,
    #[display("remove_node")]
    RemoveNode,
    #[display("add_connection")]
    AddConnection,
    #[display("remove_connection")]
    RemoveConnection,
    #[display("change_node_type")]
    ChangeNodeType,
}

impl MutationCategory {
    pub const ALL: [MutationCategory; 8] = [
        MutationCategory::Weights,
        MutationCategory::Constants,
        MutationCategory::ThinkingIterations,
        MutationCategory::AddNode,
        MutationCategory::RemoveNode,
        MutationCategory::AddConnection,
        MutationCategory::RemoveConnection,
        MutationCategory::ChangeNodeType,
    ];

    #[must_use]
    pub fn is_structural(self) -> bool {
        !matches!(
            self,
            MutationCategory::Weights
                | MutationCategory::Constants
                | MutationCategory::ThinkingIterations
        )
    }

    fn initial_evolvability(self) -> Range<f64> {
        if self.is_structural() {
            0.05..0.15
        } else {
            0.1..0.3
        }
    }
}

const INITIAL_STRENGTH: Range<f64> = 0.2..0.7;

/// One value per [`MutationCategory`].
///
/// Used twice per network: as `evolvability` (probability that a mutation of
/// the category is applied) and as `mutationStrength` (its magnitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetaParameters {
    pub weights: f64,
    pub constants: f64,
    #[serde(rename = "thinkingIterations")]
    pub thinking_iterations: f64,
    pub add_node: f64,
    pub remove_node: f64,
    pub add_connection: f64,
    pub remove_connection: f64,
    pub change_node_type: f64,
}

impl MetaParameters {
    #[must_use]
    pub fn splat(value: f64) -> Self {
        Self {
            weights: value,
            constants: value,
            thinking_iterations: value,
            add_node: value,
            remove_node: value,
            add_connection: value,
            remove_connection: value,
            change_node_type: value,
        }
    }

    /// Fresh evolvability: 0.1..0.3 for parameter categories, 0.05..0.15 for
    /// structural ones.
    pub fn random_evolvability<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self::from_fn(|cat| rng.random_range(cat.initial_evolvability()))
    }

    /// Fresh mutation strength in 0.2..0.7 for every category.
    pub fn random_mutation_strength<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self::from_fn(|_| rng.random_range(INITIAL_STRENGTH))
    }

    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(MutationCategory) -> f64,
    {
        let mut params = Self::splat(0.0);
        for cat in MutationCategory::ALL {
            *params.get_mut(cat) = f(cat);
        }
        params
    }

    #[must_use]
    pub fn get(&self, category: MutationCategory) -> f64 {
        match category {
            MutationCategory::Weights => self.weights,
            MutationCategory::Constants => self.constants,
            MutationCategory::ThinkingIterations => self.thinking_iterations,
            MutationCategory::AddNode => self.add_node,
            MutationCategory::RemoveNode => self.remove_node,
            MutationCategory::AddConnection => self.add_connection,
            MutationCategory::RemoveConnection => self.remove_connection,
            MutationCategory::ChangeNodeType => self.change_node_type,
        }
    }

    pub fn get_mut(&mut self, category: MutationCategory) -> &mut f64 {
        match category {
            MutationCategory::Weights => &mut self.weights,
            MutationCategory::Constants => &mut self.constants,
            MutationCategory::ThinkingIterations => &mut self.thinking_iterations,
            MutationCategory::AddNode => &mut self.add_node,
            MutationCategory::RemoveNode => &mut self.remove_node,
            MutationCategory::AddConnection => &mut self.add_connection,
            MutationCategory::RemoveConnection => &mut self.remove_connection,
            MutationCategory::ChangeNodeType => &mut self.change_node_type,
        }
    }
}

/// [`MetaParameters`] as found in a saved document, where any key may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialMetaParameters {
    pub weights: Option<f64>,
    pub constants: Option<f64>,
    #[serde(rename = "thinkingIterations")]
    pub thinking_iterations: Option<f64>,
    pub add_node: Option<f64>,
    pub remove_node: Option<f64>,
    pub add_connection: Option<f64>,
    pub remove_connection: Option<f64>,
    pub change_node_type: Option<f64>,
}

impl PartialMetaParameters {
    fn get(&self, category: MutationCategory) -> Option<f64> {
        match category {
            MutationCategory::Weights => self.weights,
            MutationCategory::Constants => self.constants,
            MutationCategory::ThinkingIterations => self.thinking_iterations,
            MutationCategory::AddNode => self.add_node,
            MutationCategory::RemoveNode => self.remove_node,
            MutationCategory::AddConnection => self.add_connection,
            MutationCategory::RemoveConnection => self.remove_connection,
            MutationCategory::ChangeNodeType => self.change_node_type,
        }
    }

    /// Fills absent keys from `defaults`.
    #[must_use]
    pub fn backfill(&self, defaults: &MetaParameters) -> MetaParameters {
        MetaParameters::from_fn(|cat| self.get(cat).unwrap_or_else(|| defaults.get(cat)))
    }
}
