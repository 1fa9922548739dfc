use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rand::{Rng, seq::IndexedRandom as _};
use serde::{Deserialize, Serialize};

use crate::{
    ConfigError,
    meta::MetaParameters,
    node::{Node, NodeId, NodeKind, NodeType},
};

const INITIAL_THINKING_ITERATIONS: std::ops::RangeInclusive<u32> = 40..=60;

/// Input and output width of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfig {
    pub input_size: usize,
    pub output_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            input_size: oxo_engine::BOARD_SIZE,
            output_size: oxo_engine::BOARD_SIZE,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_size == 0 {
            return Err(ConfigError::ZeroSize { field: "inputSize" });
        }
        if self.output_size == 0 {
            return Err(ConfigError::ZeroSize {
                field: "outputSize",
            });
        }
        Ok(())
    }
}

/// Evaluation order computed by Kahn's algorithm.
///
/// When the graph has a cycle, `order` holds only the nodes reachable before the
/// cycle blocked the traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologicalOrder {
    pub order: Vec<NodeId>,
    pub has_cycle: bool,
}

/// An edge `from -> to` with the effective weight `to` applies to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f64,
}

/// Result of one [`Network::forward`] pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardOutput {
    /// Output node values indexed by `outputIndex`.
    pub outputs: Vec<f64>,
    pub activated_node_ids: Vec<NodeId>,
    pub activated_connections: Vec<Connection>,
    pub cycle_detected: bool,
}

/// An evolvable computation graph.
///
/// Nodes live in an id-keyed arena and edges are the ids in each node's input
/// list, so removing a node only needs a pass over the remaining input lists.
/// The cached [`TopologicalOrder`] must be refreshed with
/// [`update_topological_order`](Self::update_topological_order) after any direct
/// structural edit.
#[derive(Debug, Clone)]
pub struct Network {
    config: NetworkConfig,
    nodes: BTreeMap<NodeId, Node>,
    input_node_ids: Vec<NodeId>,
    output_node_ids: Vec<NodeId>,
    topological_order: TopologicalOrder,
    fitness: f64,
    thinking_iterations: u32,
    evolvability: MetaParameters,
    mutation_strength: MetaParameters,
}

impl Network {
    /// Builds a minimal network: one input node per input slot and one output
    /// node per output slot, each output wired to a random input.
    ///
    /// # Panics
    ///
    /// Panics if `config` has a zero input or output size.
    pub fn new<R>(config: NetworkConfig, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        assert!(
            config.validate().is_ok(),
            "network width must be non-zero: {config:?}"
        );

        let mut nodes = BTreeMap::new();
        let input_node_ids = (0..config.input_size)
            .map(|index| {
                let id = NodeId::random(rng);
                nodes.insert(
                    id.clone(),
                    Node::new(id.clone(), NodeKind::Input { index }),
                );
                id
            })
            .collect::<Vec<_>>();
        let output_node_ids = (0..config.output_size)
            .map(|output_index| {
                let id = NodeId::random(rng);
                let source = input_node_ids[rng.random_range(0..input_node_ids.len())].clone();
                nodes.insert(
                    id.clone(),
                    Node::with_inputs(id.clone(), NodeKind::Output { output_index }, vec![source]),
                );
                id
            })
            .collect();

        let mut network = Self {
            config,
            nodes,
            input_node_ids,
            output_node_ids,
            topological_order: TopologicalOrder::default(),
            fitness: 0.0,
            thinking_iterations: rng.random_range(INITIAL_THINKING_ITERATIONS),
            evolvability: MetaParameters::random_evolvability(rng),
            mutation_strength: MetaParameters::random_mutation_strength(rng),
        };
        network.update_topological_order();
        network
    }

    /// Assembles a network from already-validated parts.
    pub(crate) fn from_parts(
        config: NetworkConfig,
        nodes: BTreeMap<NodeId, Node>,
        input_node_ids: Vec<NodeId>,
        output_node_ids: Vec<NodeId>,
        thinking_iterations: u32,
        evolvability: MetaParameters,
        mutation_strength: MetaParameters,
    ) -> Self {
        let mut network = Self {
            config,
            nodes,
            input_node_ids,
            output_node_ids,
            topological_order: TopologicalOrder::default(),
            fitness: 0.0,
            thinking_iterations,
            evolvability,
            mutation_strength,
        };
        network.update_topological_order();
        network
    }

    #[must_use]
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    #[must_use]
    pub fn nodes(&self) -> &BTreeMap<NodeId, Node> {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn input_node_ids(&self) -> &[NodeId] {
        &self.input_node_ids
    }

    #[must_use]
    pub fn output_node_ids(&self) -> &[NodeId] {
        &self.output_node_ids
    }

    #[must_use]
    pub fn topological_order(&self) -> &TopologicalOrder {
        &self.topological_order
    }

    #[must_use]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    pub fn add_fitness(&mut self, delta: f64) {
        self.fitness += delta;
    }

    #[must_use]
    pub fn thinking_iterations(&self) -> u32 {
        self.thinking_iterations
    }

    pub fn set_thinking_iterations(&mut self, iterations: u32) {
        self.thinking_iterations = iterations;
    }

    #[must_use]
    pub fn evolvability(&self) -> &MetaParameters {
        &self.evolvability
    }

    pub fn evolvability_mut(&mut self) -> &mut MetaParameters {
        &mut self.evolvability
    }

    #[must_use]
    pub fn mutation_strength(&self) -> &MetaParameters {
        &self.mutation_strength
    }

    pub fn mutation_strength_mut(&mut self) -> &mut MetaParameters {
        &mut self.mutation_strength
    }

    /// Mutable access to every node. Callers refresh the topological order after
    /// changing inputs.
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    /// Inserts or replaces a node. Callers refresh the topological order afterwards.
    pub fn insert_node(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.id().clone(), node)
    }

    /// Removes a hidden node and every reference to it, with paired weights.
    ///
    /// Input and output nodes are never removed; `None` is returned for them.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        if self.nodes.get(id)?.node_type().is_io() {
            return None;
        }
        let removed = self.nodes.remove(id)?;
        for node in self.nodes.values_mut() {
            while let Some(pos) = node.inputs().iter().position(|input| input == id) {
                node.remove_input_at(pos);
            }
        }
        Some(removed)
    }

    /// Drops input references to ids not in the graph, then pads or truncates
    /// weight lists to the input count. Padding draws from `new_weight`.
    pub fn prune_dangling_inputs<F>(&mut self, mut new_weight: F)
    where
        F: FnMut() -> f64,
    {
        let present = self.nodes.keys().cloned().collect::<BTreeSet<_>>();
        for node in self.nodes.values_mut() {
            node.inputs_mut().retain(|input| present.contains(input));
            let arity = node.inputs().len();
            if let Some(weights) = node.kind_mut().weights_mut() {
                weights.truncate(arity);
                while weights.len() < arity {
                    weights.push(new_weight());
                }
            }
        }
    }

    /// Ids of nodes that are neither inputs nor outputs.
    #[must_use]
    pub fn hidden_node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| !node.node_type().is_io())
            .map(|node| node.id().clone())
            .collect()
    }

    /// Nodes that may feed other nodes: everything except outputs.
    #[must_use]
    pub fn available_source_node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.node_type() != NodeType::Output)
            .map(|node| node.id().clone())
            .collect()
    }

    /// Nodes that may receive inputs: everything except inputs and constants.
    #[must_use]
    pub fn available_target_node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.node_type().accepts_inputs())
            .map(|node| node.id().clone())
            .collect()
    }

    /// Every edge whose source is present in the graph.
    #[must_use]
    pub fn connections(&self) -> Vec<Connection> {
        self.nodes
            .values()
            .flat_map(|node| self.incoming_connections(node))
            .collect()
    }

    fn incoming_connections<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = Connection> + 'a {
        node.inputs()
            .iter()
            .enumerate()
            .filter(|(_, input)| self.nodes.contains_key(*input))
            .map(|(i, input)| Connection {
                from: input.clone(),
                to: node.id().clone(),
                weight: node.kind().effective_weight(i),
            })
    }

    /// Kahn's algorithm over the edges whose source exists in the graph.
    #[must_use]
    pub fn compute_topological_order(&self) -> TopologicalOrder {
        let mut in_degree = self
            .nodes
            .keys()
            .map(|id| (id, 0_usize))
            .collect::<BTreeMap<_, _>>();
        let mut successors: BTreeMap<&NodeId, Vec<&NodeId>> = BTreeMap::new();
        for node in self.nodes.values() {
            for input in node.inputs() {
                if let Some((source, _)) = self.nodes.get_key_value(input) {
                    successors.entry(source).or_default().push(node.id());
                    *in_degree.entry(node.id()).or_default() += 1;
                }
            }
        }

        let mut queue = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect::<VecDeque<_>>();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            order.push(id.clone());
            for &next in successors.get(id).into_iter().flatten() {
                let degree = in_degree.entry(next).or_default();
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(next);
                }
            }
        }

        let has_cycle = order.len() < self.nodes.len();
        TopologicalOrder { order, has_cycle }
    }

    /// Recomputes and caches the evaluation order.
    pub fn update_topological_order(&mut self) {
        let had_cycle = self.topological_order.has_cycle;
        self.topological_order = self.compute_topological_order();
        if self.topological_order.has_cycle && !had_cycle {
            tracing::warn!(
                evaluated = self.topological_order.order.len(),
                nodes = self.nodes.len(),
                "cycle detected in network; nodes in the cycle are skipped during evaluation",
            );
        }
    }

    /// Evaluates every node once in the cached topological order.
    ///
    /// # Panics
    ///
    /// Panics if `inputs.len()` differs from the configured input size.
    pub fn forward<R>(&mut self, inputs: &[f64], rng: &mut R) -> ForwardOutput
    where
        R: Rng + ?Sized,
    {
        assert_eq!(
            inputs.len(),
            self.config.input_size,
            "input vector width mismatch"
        );

        for node in self.nodes.values_mut() {
            node.reset_value();
        }

        let Self {
            config,
            nodes,
            topological_order,
            ..
        } = self;
        let mut output = ForwardOutput {
            outputs: vec![0.0; config.output_size],
            activated_node_ids: Vec::with_capacity(topological_order.order.len()),
            activated_connections: vec![],
            cycle_detected: topological_order.has_cycle,
        };

        let mut input_values = Vec::new();
        for id in &topological_order.order {
            let Some(node) = nodes.get(id) else {
                continue;
            };
            input_values.clear();
            input_values.extend(
                node.inputs()
                    .iter()
                    .map(|input| nodes.get(input).map(Node::value)),
            );

            let Some(node) = nodes.get_mut(id) else {
                continue;
            };
            let value = node.evaluate(&input_values, inputs, rng);
            output.activated_node_ids.push(id.clone());
            for (i, (input, present)) in node.inputs().iter().zip(&input_values).enumerate() {
                if present.is_some() {
                    output.activated_connections.push(Connection {
                        from: input.clone(),
                        to: id.clone(),
                        weight: node.kind().effective_weight(i),
                    });
                }
            }
            if let NodeKind::Output { output_index } = node.kind()
                && let Some(slot) = output.outputs.get_mut(*output_index)
            {
                *slot = value;
            }
        }
        output
    }

    /// Runs [`forward`](Self::forward) `thinking_iterations` times (at least once)
    /// on the same inputs and returns the last pass.
    pub fn think<R>(&mut self, inputs: &[f64], rng: &mut R) -> ForwardOutput
    where
        R: Rng + ?Sized,
    {
        let mut output = self.forward(inputs, rng);
        for _ in 1..self.thinking_iterations {
            output = self.forward(inputs, rng);
        }
        output
    }

    /// Picks a random element of `ids`; helper for the structural operators.
    pub(crate) fn choose_id<R>(ids: &[NodeId], rng: &mut R) -> Option<NodeId>
    where
        R: Rng + ?Sized,
    {
        ids.choose(rng).cloned()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    /// Network whose outputs are all wired to input 0.
    fn wired_to_first_input(rng: &mut Pcg64Mcg) -> Network {
        let mut network = Network::new(NetworkConfig::default(), rng);
        let first = network.input_node_ids()[0].clone();
        for id in network.output_node_ids().to_vec() {
            let node = network.node_mut(&id).unwrap();
            *node.inputs_mut() = vec![first.clone()];
        }
        network.set_thinking_iterations(1);
        network.update_topological_order();
        network
    }

    #[test]
    fn test_minimal_network_shape() {
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let network = Network::new(NetworkConfig::default(), &mut rng);
        assert_eq!(network.node_count(), 18);
        assert!(network.hidden_node_ids().is_empty());
        assert!(INITIAL_THINKING_ITERATIONS.contains(&network.thinking_iterations()));
        assert!(!network.topological_order().has_cycle);
        assert_eq!(network.topological_order().order.len(), 18);
        for id in network.output_node_ids() {
            let node = network.node(id).unwrap();
            assert_eq!(node.inputs().len(), 1);
            assert!(network.input_node_ids().contains(&node.inputs()[0]));
        }
    }

    #[test]
    fn test_single_wire_passes_first_input() {
        let mut rng = Pcg64Mcg::seed_from_u64(2);
        let mut network = wired_to_first_input(&mut rng);
        // Rewire every output but the first to input 1, which stays 0.
        let second = network.input_node_ids()[1].clone();
        for id in network.output_node_ids()[1..].to_vec() {
            *network.node_mut(&id).unwrap().inputs_mut() = vec![second.clone()];
        }
        network.update_topological_order();

        let mut inputs = [0.0; 9];
        inputs[0] = 1.0;
        let output = network.think(&inputs, &mut rng);
        assert!((output.outputs[0] - 1.0).abs() < 1e-12);
        assert!(output.outputs[1..].iter().all(|v| *v == 0.0));
        assert!(!output.cycle_detected);
        assert_eq!(output.activated_node_ids.len(), 18);
        assert_eq!(output.activated_connections.len(), 9);
    }

    #[test]
    fn test_latch_scenario() {
        let mut rng = Pcg64Mcg::seed_from_u64(3);
        let mut network = wired_to_first_input(&mut rng);
        let data = network.input_node_ids()[0].clone();
        let gate = network.input_node_ids()[1].clone();
        let latch = NodeId::new("latch");
        network.insert_node(Node::with_inputs(
            latch.clone(),
            NodeKind::Latch { latched_value: 0.0 },
            vec![data, gate],
        ));
        network.update_topological_order();

        let mut inputs = [0.0; 9];
        inputs[0] = 5.0;
        network.forward(&inputs, &mut rng);
        let latched = |n: &Network| match n.node(&latch).unwrap().kind() {
            NodeKind::Latch { latched_value } => *latched_value,
            kind => panic!("unexpected kind {kind:?}"),
        };
        assert!(latched(&network).abs() < 1e-12);

        inputs[1] = 0.6;
        network.forward(&inputs, &mut rng);
        assert!((latched(&network) - 5.0).abs() < 1e-12);
        assert!((network.node(&latch).unwrap().value() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_mutual_cycle_is_detected() {
        let mut rng = Pcg64Mcg::seed_from_u64(4);
        let mut network = Network::new(
            NetworkConfig {
                input_size: 1,
                output_size: 1,
            },
            &mut rng,
        );
        let (a, b) = (NodeId::new("a"), NodeId::new("b"));
        network.insert_node(Node::with_inputs(a.clone(), NodeKind::Sin, vec![b.clone()]));
        network.insert_node(Node::with_inputs(b.clone(), NodeKind::Cos, vec![a.clone()]));

        let cyclic = Network::compute_topological_order(&network);
        assert!(cyclic.has_cycle);
        assert!(!cyclic.order.contains(&a) && !cyclic.order.contains(&b));

        let mut only_pair = network.clone();
        for id in only_pair.input_node_ids().to_vec() {
            only_pair.nodes.remove(&id);
        }
        for id in only_pair.output_node_ids().to_vec() {
            only_pair.nodes.remove(&id);
        }
        let order = only_pair.compute_topological_order();
        assert!(order.has_cycle);
        assert!(order.order.len() < 2);

        // Evaluation still runs over the partial order.
        network.update_topological_order();
        let output = network.forward(&[1.0], &mut rng);
        assert!(output.cycle_detected);
        assert_eq!(output.activated_node_ids.len(), 2);
    }

    #[test]
    fn test_dangling_inputs_are_ignored_then_pruned() {
        let mut rng = Pcg64Mcg::seed_from_u64(5);
        let mut network = wired_to_first_input(&mut rng);
        let first = network.input_node_ids()[0].clone();
        let add = NodeId::new("add");
        network.insert_node(Node::with_inputs(
            add.clone(),
            NodeKind::Add {
                weights: vec![2.0, 3.0],
            },
            vec![first, NodeId::new("ghost")],
        ));
        network.update_topological_order();
        assert!(!network.topological_order().has_cycle);

        let mut inputs = [0.0; 9];
        inputs[0] = 1.5;
        network.forward(&inputs, &mut rng);
        assert!((network.node(&add).unwrap().value() - 3.0).abs() < 1e-12);

        network.prune_dangling_inputs(|| 0.5);
        let node = network.node(&add).unwrap();
        assert_eq!(node.inputs().len(), 1);
        assert_eq!(node.kind().weights().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_node_prunes_references() {
        let mut rng = Pcg64Mcg::seed_from_u64(6);
        let mut network = wired_to_first_input(&mut rng);
        let first = network.input_node_ids()[0].clone();
        let sin = NodeId::new("sin");
        network.insert_node(Node::with_inputs(sin.clone(), NodeKind::Sin, vec![first]));
        let out = network.output_node_ids()[0].clone();
        network.node_mut(&out).unwrap().inputs_mut().insert(0, sin.clone());
        network.update_topological_order();

        assert!(network.remove_node(&out).is_none());
        assert!(network.remove_node(&sin).is_some());
        assert!(network.nodes().values().all(|n| !n.inputs().contains(&sin)));
    }

    #[test]
    fn test_forward_is_deterministic_without_random_nodes() {
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let mut network = wired_to_first_input(&mut rng);
        let inputs = network.input_node_ids().to_vec();
        network.insert_node(Node::with_inputs(
            NodeId::new("mul"),
            NodeKind::Multiply {
                weights: vec![0.5, -1.5],
            },
            vec![inputs[2].clone(), inputs[3].clone()],
        ));
        let out = network.output_node_ids()[4].clone();
        *network.node_mut(&out).unwrap().inputs_mut() = vec![NodeId::new("mul")];
        network.update_topological_order();

        let x = [0.1, -0.2, 0.3, 0.4, 0.0, 1.0, -1.0, 0.5, 0.7];
        let first = network.forward(&x, &mut rng);
        let second = network.forward(&x, &mut rng);
        assert_eq!(first.outputs, second.outputs);
        assert!((first.outputs[4] - 0.3 * 0.5 * 0.4 * -1.5).abs() < 1e-12);
    }
}
