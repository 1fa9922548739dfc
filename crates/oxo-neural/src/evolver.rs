use rand::{Rng, seq::IndexedRandom as _};
use serde::{Deserialize, Serialize};

use crate::{
    ConfigError,
    meta::MutationCategory,
    network::{Connection, Network},
    node::{Node, NodeId, NodeKind, NodeType},
    random,
};

/// Closed interval used to clamp mutated values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    fn validate(self, field: &'static str) -> Result<(), ConfigError> {
        if self.min.is_finite() && self.max.is_finite() && self.min <= self.max {
            Ok(())
        } else {
            Err(ConfigError::InvalidRange {
                field,
                min: self.min,
                max: self.max,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MutationConfig {
    /// A mutation delta is `(gaussian * multiplier - offset) * strength`.
    pub gaussian_multiplier: f64,
    pub gaussian_offset: f64,
    pub evolvability_range: Bounds,
    pub strength_range: Bounds,
    pub weight_range: Bounds,
    pub constant_range: Bounds,
    pub thinking_iterations_range: Bounds,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            gaussian_multiplier: 0.6,
            gaussian_offset: 0.3,
            evolvability_range: Bounds::new(0.01, 1.0),
            strength_range: Bounds::new(0.01, 2.0),
            weight_range: Bounds::new(-10.0, 10.0),
            constant_range: Bounds::new(-10.0, 10.0),
            thinking_iterations_range: Bounds::new(1.0, 100.0),
        }
    }
}

impl MutationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.evolvability_range.validate("evolvabilityRange")?;
        self.strength_range.validate("strengthRange")?;
        self.weight_range.validate("weightRange")?;
        self.constant_range.validate("constantRange")?;
        self.thinking_iterations_range
            .validate("thinkingIterationsRange")?;
        if self.thinking_iterations_range.min < 1.0 {
            return Err(ConfigError::InvalidRange {
                field: "thinkingIterationsRange",
                min: self.thinking_iterations_range.min,
                max: self.thinking_iterations_range.max,
            });
        }
        Ok(())
    }
}

/// Mutation and crossover operators.
///
/// Every probability and magnitude comes from the network being mutated
/// (its evolvability and mutation strength), including the mutation of those
/// meta-parameters themselves. The evolver only holds the clamping ranges and
/// the shape of the mutation delta.
#[derive(Debug, Clone, Default)]
pub struct NetworkEvolver {
    config: MutationConfig,
}

impl NetworkEvolver {
    #[must_use]
    pub fn new(config: MutationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    /// Multiplicative perturbation gated by `evolvability`, then clamped.
    fn perturb<R>(
        &self,
        value: f64,
        evolvability: f64,
        strength: f64,
        bounds: Bounds,
        rng: &mut R,
    ) -> f64
    where
        R: Rng + ?Sized,
    {
        let mut value = value;
        if random::gaussian_unit(rng) < evolvability {
            let delta = random::gaussian_unit(rng) * self.config.gaussian_multiplier
                - self.config.gaussian_offset;
            value += value * delta * strength;
        }
        bounds.clamp(value)
    }

    fn fresh_weight<R>(&self, rng: &mut R) -> f64
    where
        R: Rng + ?Sized,
    {
        self.config.weight_range.clamp(random::initial_weight(rng))
    }

    fn gate<R>(network: &Network, category: MutationCategory, rng: &mut R) -> bool
    where
        R: Rng + ?Sized,
    {
        random::gaussian_unit(rng) < network.evolvability().get(category)
    }

    /// Applies one round of parameter, meta-parameter and structural mutations,
    /// then refreshes the topological order.
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn mutate<R>(&self, network: &mut Network, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let evolvability = *network.evolvability();
        let strength = *network.mutation_strength();
        let (weight_p, weight_s) = (
            evolvability.get(MutationCategory::Weights),
            strength.get(MutationCategory::Weights),
        );
        let (constant_p, constant_s) = (
            evolvability.get(MutationCategory::Constants),
            strength.get(MutationCategory::Constants),
        );
        for node in network.nodes_mut() {
            match node.kind_mut() {
                NodeKind::Constant { value } => {
                    let range = self.config.constant_range;
                    *value = self.perturb(*value, constant_p, constant_s, range, rng);
                }
                kind => {
                    let range = self.config.weight_range;
                    for w in kind.weights_mut().into_iter().flatten() {
                        *w = self.perturb(*w, weight_p, weight_s, range, rng);
                    }
                }
            }
        }

        let thinking = self.perturb(
            f64::from(network.thinking_iterations()),
            evolvability.get(MutationCategory::ThinkingIterations),
            strength.get(MutationCategory::ThinkingIterations),
            self.config.thinking_iterations_range,
            rng,
        );
        network.set_thinking_iterations(thinking.floor() as u32);

        for category in MutationCategory::ALL {
            let current = network.evolvability().get(category);
            let strength = network.mutation_strength().get(category);
            let range = self.config.evolvability_range;
            let mutated = self.perturb(current, current, strength, range, rng);
            *network.evolvability_mut().get_mut(category) = mutated;
        }
        for category in MutationCategory::ALL {
            let evolvability = network.evolvability().get(category);
            let current = network.mutation_strength().get(category);
            let range = self.config.strength_range;
            let mutated = self.perturb(current, evolvability, current, range, rng);
            *network.mutation_strength_mut().get_mut(category) = mutated;
        }

        if Self::gate(network, MutationCategory::AddNode, rng) {
            self.add_random_node(network, rng);
        }
        if Self::gate(network, MutationCategory::RemoveNode, rng) {
            self.remove_random_node(network, rng);
        }
        if Self::gate(network, MutationCategory::AddConnection, rng) {
            self.add_random_connection(network, rng);
        }
        if Self::gate(network, MutationCategory::RemoveConnection, rng) {
            self.remove_random_connection(network, rng);
        }
        if Self::gate(network, MutationCategory::ChangeNodeType, rng) {
            self.change_random_node_type(network, rng);
        }

        network.update_topological_order();
    }

    /// Adds a hidden node of a random kind wired to random sources.
    ///
    /// Single-input kinds take one source, `Add`/`Multiply` take 2 to 5 distinct
    /// sources, and `Subtract`/`Divide`/`Latch` take two distinct sources. Returns
    /// `None` without changing the network when there are too few sources.
    pub fn add_random_node<R>(&self, network: &mut Network, rng: &mut R) -> Option<NodeId>
    where
        R: Rng + ?Sized,
    {
        let node_type = *NodeType::HIDDEN.choose(rng)?;
        let sources = network.available_source_node_ids();
        let inputs = match node_type.input_arity() {
            Some(0) => vec![],
            Some(1) => vec![sources.choose(rng)?.clone()],
            arity => {
                let count = arity.unwrap_or_else(|| rng.random_range(2..=5));
                if sources.len() < count {
                    return None;
                }
                sources.choose_multiple(rng, count).cloned().collect()
            }
        };

        let weights = if node_type.is_weighted() {
            inputs.iter().map(|_| self.fresh_weight(rng)).collect()
        } else {
            vec![]
        };
        let constant = if node_type == NodeType::Constant {
            random::initial_weight(rng)
        } else {
            0.0
        };
        let id = fresh_node_id(network, rng);
        network.insert_node(Node::with_inputs(
            id.clone(),
            NodeKind::hidden(node_type, weights, constant),
            inputs,
        ));
        Some(id)
    }

    /// Removes a random hidden node and every reference to it.
    #[expect(clippy::unused_self)]
    pub fn remove_random_node<R>(&self, network: &mut Network, rng: &mut R) -> Option<Node>
    where
        R: Rng + ?Sized,
    {
        let id = Network::choose_id(&network.hidden_node_ids(), rng)?;
        network.remove_node(&id)
    }

    /// Adds an edge from a random source to a random target, unless it would be
    /// a self-loop or already exists.
    pub fn add_random_connection<R>(
        &self,
        network: &mut Network,
        rng: &mut R,
    ) -> Option<Connection>
    where
        R: Rng + ?Sized,
    {
        let from = Network::choose_id(&network.available_source_node_ids(), rng)?;
        let to = Network::choose_id(&network.available_target_node_ids(), rng)?;
        if from == to {
            return None;
        }
        let target = network.node_mut(&to)?;
        if target.inputs().contains(&from) {
            return None;
        }
        target.inputs_mut().push(from.clone());
        let mut weight = 1.0;
        if let Some(weights) = target.kind_mut().weights_mut() {
            weight = self.fresh_weight(rng);
            weights.push(weight);
        }
        Some(Connection { from, to, weight })
    }

    /// Removes a random input edge of a random target, with its paired weight.
    #[expect(clippy::unused_self)]
    pub fn remove_random_connection<R>(
        &self,
        network: &mut Network,
        rng: &mut R,
    ) -> Option<Connection>
    where
        R: Rng + ?Sized,
    {
        let candidates = network
            .available_target_node_ids()
            .into_iter()
            .filter(|id| network.node(id).is_some_and(|n| !n.inputs().is_empty()))
            .collect::<Vec<_>>();
        let to = Network::choose_id(&candidates, rng)?;
        let node = network.node_mut(&to)?;
        let index = rng.random_range(0..node.inputs().len());
        let weight = node.kind().effective_weight(index);
        let from = node.remove_input_at(index);
        Some(Connection { from, to, weight })
    }

    /// Switches a random hidden node to a different hidden kind in place.
    ///
    /// The id is kept. Inputs are truncated to what the new kind reads, weights
    /// are carried over where both kinds are weighted (padded with fresh values),
    /// and constant or stateful parameters start fresh.
    pub fn change_random_node_type<R>(
        &self,
        network: &mut Network,
        rng: &mut R,
    ) -> Option<(NodeType, NodeType)>
    where
        R: Rng + ?Sized,
    {
        let id = Network::choose_id(&network.hidden_node_ids(), rng)?;
        let new_type = *NodeType::HIDDEN.choose(rng)?;
        let node = network.node_mut(&id)?;
        let old_type = node.node_type();
        if old_type == new_type {
            return None;
        }

        if let Some(arity) = new_type.input_arity() {
            node.inputs_mut().truncate(arity);
        }
        let arity = node.inputs().len();
        let weights = if new_type.is_weighted() {
            let mut weights = node.kind().weights().map(<[f64]>::to_vec).unwrap_or_default();
            weights.truncate(arity);
            while weights.len() < arity {
                weights.push(self.fresh_weight(rng));
            }
            weights
        } else {
            vec![]
        };
        let constant = if new_type == NodeType::Constant {
            random::initial_weight(rng)
        } else {
            0.0
        };
        node.set_kind(NodeKind::hidden(new_type, weights, constant));
        Some((old_type, new_type))
    }

    /// Builds a child from `parent1`, taking each hidden gene from `parent2`
    /// with probability 1/2 when `parent2` has a node with the same id.
    pub fn crossover<R>(&self, parent1: &Network, parent2: &Network, rng: &mut R) -> Network
    where
        R: Rng + ?Sized,
    {
        let mut child = parent1.clone();
        for id in child.hidden_node_ids() {
            if !rng.random_bool(0.5) {
                continue;
            }
            if let Some(gene) = parent2.node(&id).filter(|n| !n.node_type().is_io()) {
                child.insert_node(gene.clone());
            }
        }
        child.prune_dangling_inputs(|| self.fresh_weight(rng));
        child.update_topological_order();
        child
    }
}

fn fresh_node_id<R>(network: &Network, rng: &mut R) -> NodeId
where
    R: Rng + ?Sized,
{
    loop {
        let id = NodeId::random(rng);
        if network.node(&id).is_none() {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::{MetaParameters, NetworkConfig};

    fn grown_network(rng: &mut Pcg64Mcg, nodes: usize) -> Network {
        let evolver = NetworkEvolver::default();
        let mut network = Network::new(NetworkConfig::default(), rng);
        while network.hidden_node_ids().len() < nodes {
            evolver.add_random_node(&mut network, rng);
        }
        network.update_topological_order();
        network
    }

    #[test]
    fn test_added_nodes_respect_arity() {
        let mut rng = Pcg64Mcg::seed_from_u64(21);
        let network = grown_network(&mut rng, 60);
        for id in network.hidden_node_ids() {
            let node = network.node(&id).unwrap();
            let ty = node.node_type();
            let n = node.inputs().len();
            match ty.input_arity() {
                Some(arity) => assert_eq!(n, arity, "{ty}"),
                None => assert!((2..=5).contains(&n), "{ty} with {n} inputs"),
            }
            if matches!(ty, NodeType::Subtract | NodeType::Divide | NodeType::Latch) {
                assert_ne!(node.inputs()[0], node.inputs()[1]);
            }
            if let Some(weights) = node.kind().weights() {
                assert_eq!(weights.len(), n);
                assert!(weights.iter().all(|w| (-1.0..1.0).contains(w)));
            }
            assert!(node.inputs().iter().all(|i| network.node(i).is_some()));
        }
    }

    #[test]
    fn test_mutation_respects_clamping() {
        let mut rng = Pcg64Mcg::seed_from_u64(22);
        let evolver = NetworkEvolver::default();
        let mut network = grown_network(&mut rng, 10);
        *network.evolvability_mut() = MetaParameters::splat(1.0);
        *network.mutation_strength_mut() = MetaParameters::splat(2.0);

        let config = *evolver.config();
        for _ in 0..300 {
            evolver.mutate(&mut network, &mut rng);
            for node in network.nodes().values() {
                if let NodeKind::Constant { value } = node.kind() {
                    assert!(config.constant_range.contains(*value));
                }
                for w in node.kind().weights().unwrap_or_default() {
                    assert!(config.weight_range.contains(*w));
                }
            }
            assert!((1..=100).contains(&network.thinking_iterations()));
            for cat in MutationCategory::ALL {
                assert!(config.evolvability_range.contains(network.evolvability().get(cat)));
                assert!(config.strength_range.contains(network.mutation_strength().get(cat)));
            }
            assert_eq!(
                network.topological_order(),
                &network.compute_topological_order()
            );
        }
    }

    #[test]
    fn test_structural_ops_keep_graph_consistent() {
        let mut rng = Pcg64Mcg::seed_from_u64(23);
        let evolver = NetworkEvolver::default();
        let mut network = grown_network(&mut rng, 8);
        for _ in 0..200 {
            match rng.random_range(0..5) {
                0 => {
                    let _ = evolver.add_random_node(&mut network, &mut rng);
                },
                1 => {
                    let _ = evolver.remove_random_node(&mut network, &mut rng);
                },
                2 => {
                    let _ = evolver.add_random_connection(&mut network, &mut rng);
                },
                3 => {
                    let _ = evolver.remove_random_connection(&mut network, &mut rng);
                },
                _ => {
                    let _ = evolver.change_random_node_type(&mut network, &mut rng);
                },
            }
            for node in network.nodes().values() {
                assert!(node.inputs().iter().all(|i| network.node(i).is_some()));
                assert!(!node.inputs().contains(node.id()));
                if let Some(weights) = node.kind().weights() {
                    assert_eq!(weights.len(), node.inputs().len());
                }
                if !node.node_type().accepts_inputs() {
                    assert!(node.inputs().is_empty());
                }
            }
        }
        assert_eq!(network.input_node_ids().len(), 9);
        assert_eq!(network.output_node_ids().len(), 9);
    }

    #[test]
    fn test_change_node_type_keeps_id() {
        let mut rng = Pcg64Mcg::seed_from_u64(24);
        let evolver = NetworkEvolver::default();
        let mut network = grown_network(&mut rng, 1);
        let id = network.hidden_node_ids()[0].clone();
        let before = network.node(&id).unwrap().node_type();
        let (old, new) = loop {
            if let Some(change) = evolver.change_random_node_type(&mut network, &mut rng) {
                break change;
            }
        };
        assert_eq!(old, before);
        assert_eq!(network.node(&id).unwrap().node_type(), new);
        assert_eq!(network.hidden_node_ids(), vec![id]);
    }

    #[test]
    fn test_crossover_preserves_gene_identity() {
        let mut rng = Pcg64Mcg::seed_from_u64(25);
        let evolver = NetworkEvolver::default();
        let parent1 = grown_network(&mut rng, 20);
        let mut parent2 = parent1.clone();
        for id in parent2.hidden_node_ids() {
            let node = parent2.node_mut(&id).unwrap();
            match node.kind_mut() {
                NodeKind::Constant { value } => *value += 100.0,
                kind => {
                    for w in kind.weights_mut().into_iter().flatten() {
                        *w += 100.0;
                    }
                }
            }
        }

        let mut from_first = 0;
        let mut from_second = 0;
        for _ in 0..10 {
            let child = evolver.crossover(&parent1, &parent2, &mut rng);
            assert_eq!(child.node_count(), parent1.node_count());
            for (id, node) in child.nodes() {
                let a = parent1.node(id).unwrap();
                let b = parent2.node(id).unwrap();
                if node == a {
                    from_first += 1;
                } else {
                    assert_eq!(node, b, "node {id} is a blend");
                    from_second += 1;
                }
            }
        }
        assert!(from_first > 0 && from_second > 0);
    }
}
