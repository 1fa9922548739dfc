//! The serialized network document.
//!
//! ```json
//! {
//!   "config": { "inputSize": 9, "outputSize": 9 },
//!   "nodes": [{ "id": "k3x9a0f1q", "type": "AddNode", "inputs": ["..."], "parameters": { "weights": [0.4] } }],
//!   "inputNodeIds": ["..."],
//!   "outputNodeIds": ["..."],
//!   "fitness": 0.0,
//!   "thinkingIterations": 42,
//!   "evolvability": { "weights": 0.2, "add_node": 0.1, "...": 0.0 },
//!   "mutationStrength": { "weights": 0.5, "...": 0.0 }
//! }
//! ```
//!
//! Loading is strict about structure (unknown node types, missing required
//! parameters, I/O width) and lenient about everything that has a sensible
//! default: absent `fitness` is 0, absent or zero `thinkingIterations` is 1, and
//! absent meta-parameter keys are drawn fresh.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    meta::{MetaParameters, PartialMetaParameters},
    network::{Network, NetworkConfig},
    node::{Node, NodeId, NodeKind, NodeType},
};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum NetworkFormatError {
    #[display("unknown node type '{type_tag}' on node {node_id}")]
    UnknownNodeType { node_id: NodeId, type_tag: String },
    #[display("node {node_id} of type {node_type} has no '{parameter}' parameter")]
    MissingParameter {
        node_id: NodeId,
        node_type: NodeType,
        parameter: &'static str,
    },
    #[display("node id {node_id} appears more than once")]
    DuplicateNodeId { node_id: NodeId },
    #[display("{field} lists {actual} nodes but the config expects {expected}")]
    WidthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[display("{field} references {node_id}, which is missing or not a {expected} node")]
    MissingIoNode {
        field: &'static str,
        node_id: NodeId,
        expected: NodeType,
    },
    #[display("output node {node_id} has invalid or duplicate outputIndex {output_index}")]
    InvalidOutputIndex { node_id: NodeId, output_index: usize },
    #[display("malformed network JSON: {_0}")]
    #[from]
    Json(serde_json::Error),
}

/// Kind-specific parameter bag of a serialized node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_index: Option<usize>,
    /// `null` entries are unset weights and evaluate as 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<Option<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_state: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latched_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub inputs: Vec<NodeId>,
    #[serde(default)]
    pub parameters: NodeParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    #[serde(default)]
    pub config: NetworkConfig,
    pub nodes: Vec<NodeRecord>,
    pub input_node_ids: Vec<NodeId>,
    pub output_node_ids: Vec<NodeId>,
    #[serde(default)]
    pub fitness: Option<f64>,
    #[serde(default)]
    pub thinking_iterations: Option<u32>,
    #[serde(default)]
    pub evolvability: Option<PartialMetaParameters>,
    #[serde(default)]
    pub mutation_strength: Option<PartialMetaParameters>,
}

impl NodeRecord {
    #[must_use]
    pub fn from_node(node: &Node) -> Self {
        let mut parameters = NodeParameters::default();
        match node.kind() {
            NodeKind::Input { index } => parameters.index = Some(*index),
            NodeKind::Constant { value } => parameters.value = Some(*value),
            NodeKind::Output { output_index } => parameters.output_index = Some(*output_index),
            NodeKind::Add { weights }
            | NodeKind::Subtract { weights }
            | NodeKind::Multiply { weights }
            | NodeKind::Divide { weights } => {
                parameters.weights = Some(
                    weights.iter().map(|w| (!w.is_nan()).then_some(*w)).collect(),
                );
            }
            NodeKind::Sin | NodeKind::Cos | NodeKind::Random => {}
            NodeKind::Memory { memory_state } => parameters.memory_state = Some(*memory_state),
            NodeKind::Latch { latched_value } => parameters.latched_value = Some(*latched_value),
        }
        Self {
            id: node.id().clone(),
            type_tag: node.node_type().to_string(),
            inputs: node.inputs().to_vec(),
            parameters,
        }
    }

    pub fn to_node(&self) -> Result<Node, NetworkFormatError> {
        let node_type =
            NodeType::from_tag(&self.type_tag).ok_or_else(|| NetworkFormatError::UnknownNodeType {
                node_id: self.id.clone(),
                type_tag: self.type_tag.clone(),
            })?;
        let missing = |parameter| NetworkFormatError::MissingParameter {
            node_id: self.id.clone(),
            node_type,
            parameter,
        };
        let params = &self.parameters;
        let weights = || {
            params
                .weights
                .iter()
                .flatten()
                .map(|w| w.unwrap_or(f64::NAN))
                .collect::<Vec<_>>()
        };

        let kind = match node_type {
            NodeType::Input => NodeKind::Input {
                index: params.index.ok_or_else(|| missing("index"))?,
            },
            NodeType::Constant => NodeKind::Constant {
                value: params.value.ok_or_else(|| missing("value"))?,
            },
            NodeType::Output => NodeKind::Output {
                output_index: params.output_index.ok_or_else(|| missing("outputIndex"))?,
            },
            NodeType::Add => NodeKind::Add { weights: weights() },
            NodeType::Subtract => NodeKind::Subtract { weights: weights() },
            NodeType::Multiply => NodeKind::Multiply { weights: weights() },
            NodeType::Divide => NodeKind::Divide { weights: weights() },
            NodeType::Sin => NodeKind::Sin,
            NodeType::Cos => NodeKind::Cos,
            NodeType::Random => NodeKind::Random,
            NodeType::Memory => NodeKind::Memory {
                memory_state: params.memory_state.unwrap_or(0.0),
            },
            NodeType::Latch => NodeKind::Latch {
                latched_value: params.latched_value.unwrap_or(0.0),
            },
        };
        Ok(Node::with_inputs(self.id.clone(), kind, self.inputs.clone()))
    }
}

impl NetworkRecord {
    #[must_use]
    pub fn from_network(network: &Network) -> Self {
        let partial = |m: &MetaParameters| PartialMetaParameters {
            weights: Some(m.weights),
            constants: Some(m.constants),
            thinking_iterations: Some(m.thinking_iterations),
            add_node: Some(m.add_node),
            remove_node: Some(m.remove_node),
            add_connection: Some(m.add_connection),
            remove_connection: Some(m.remove_connection),
            change_node_type: Some(m.change_node_type),
        };
        Self {
            config: *network.config(),
            nodes: network.nodes().values().map(NodeRecord::from_node).collect(),
            input_node_ids: network.input_node_ids().to_vec(),
            output_node_ids: network.output_node_ids().to_vec(),
            fitness: Some(network.fitness()),
            thinking_iterations: Some(network.thinking_iterations()),
            evolvability: Some(partial(network.evolvability())),
            mutation_strength: Some(partial(network.mutation_strength())),
        }
    }

    /// Rebuilds a network, drawing any absent meta-parameters from `rng`.
    pub fn to_network<R>(&self, rng: &mut R) -> Result<Network, NetworkFormatError>
    where
        R: Rng + ?Sized,
    {
        let mut nodes = BTreeMap::new();
        for record in &self.nodes {
            let node = record.to_node()?;
            if nodes.insert(node.id().clone(), node).is_some() {
                return Err(NetworkFormatError::DuplicateNodeId {
                    node_id: record.id.clone(),
                });
            }
        }

        check_io_nodes(
            &nodes,
            "inputNodeIds",
            &self.input_node_ids,
            self.config.input_size,
            NodeType::Input,
        )?;
        check_io_nodes(
            &nodes,
            "outputNodeIds",
            &self.output_node_ids,
            self.config.output_size,
            NodeType::Output,
        )?;
        let mut seen_outputs = BTreeSet::new();
        for node in nodes.values() {
            if let NodeKind::Output { output_index } = node.kind()
                && (*output_index >= self.config.output_size || !seen_outputs.insert(*output_index))
            {
                return Err(NetworkFormatError::InvalidOutputIndex {
                    node_id: node.id().clone(),
                    output_index: *output_index,
                });
            }
        }

        let evolvability = self
            .evolvability
            .unwrap_or_default()
            .backfill(&MetaParameters::random_evolvability(rng));
        let mutation_strength = self
            .mutation_strength
            .unwrap_or_default()
            .backfill(&MetaParameters::random_mutation_strength(rng));

        let mut network = Network::from_parts(
            self.config,
            nodes,
            self.input_node_ids.clone(),
            self.output_node_ids.clone(),
            self.thinking_iterations.filter(|&t| t > 0).unwrap_or(1),
            evolvability,
            mutation_strength,
        );
        network.set_fitness(self.fitness.unwrap_or(0.0));
        Ok(network)
    }
}

fn check_io_nodes(
    nodes: &BTreeMap<NodeId, Node>,
    field: &'static str,
    ids: &[NodeId],
    expected_len: usize,
    expected: NodeType,
) -> Result<(), NetworkFormatError> {
    if ids.len() != expected_len {
        return Err(NetworkFormatError::WidthMismatch {
            field,
            expected: expected_len,
            actual: ids.len(),
        });
    }
    if let Some(id) = ids
        .iter()
        .find(|id| nodes.get(*id).is_none_or(|node| node.node_type() != expected))
    {
        return Err(NetworkFormatError::MissingIoNode {
            field,
            node_id: id.clone(),
            expected,
        });
    }
    Ok(())
}

impl Network {
    #[must_use]
    pub fn to_record(&self) -> NetworkRecord {
        NetworkRecord::from_network(self)
    }

    pub fn from_record<R>(record: &NetworkRecord, rng: &mut R) -> Result<Self, NetworkFormatError>
    where
        R: Rng + ?Sized,
    {
        record.to_network(rng)
    }

    pub fn to_json(&self) -> Result<String, NetworkFormatError> {
        Ok(serde_json::to_string_pretty(&self.to_record())?)
    }

    pub fn from_json<R>(json: &str, rng: &mut R) -> Result<Self, NetworkFormatError>
    where
        R: Rng + ?Sized,
    {
        let record: NetworkRecord = serde_json::from_str(json)?;
        record.to_network(rng)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::{MutationCategory, NetworkEvolver};

    fn evolved_network(rng: &mut Pcg64Mcg) -> Network {
        let mut network = Network::new(NetworkConfig::default(), rng);
        let evolver = NetworkEvolver::default();
        for _ in 0..30 {
            evolver.add_random_node(&mut network, rng);
            evolver.add_random_connection(&mut network, rng);
        }
        network.update_topological_order();
        network.set_fitness(12.5);
        network
    }

    fn has_random_node(network: &Network) -> bool {
        network
            .nodes()
            .values()
            .any(|node| node.node_type() == NodeType::Random)
    }

    #[test]
    fn test_round_trip_preserves_structure_and_behavior() {
        let mut rng = Pcg64Mcg::seed_from_u64(11);
        let mut network = evolved_network(&mut rng);
        while has_random_node(&network) {
            network = evolved_network(&mut rng);
        }

        let json = network.to_json().unwrap();
        let mut restored = Network::from_json(&json, &mut rng).unwrap();

        assert_eq!(restored.node_count(), network.node_count());
        assert_eq!(restored.connections().len(), network.connections().len());
        assert_eq!(restored.evolvability(), network.evolvability());
        assert_eq!(restored.mutation_strength(), network.mutation_strength());
        assert_eq!(restored.thinking_iterations(), network.thinking_iterations());
        assert!((restored.fitness() - 12.5).abs() < 1e-12);
        assert_eq!(restored.to_record(), network.to_record());

        let inputs = [0.3, -0.1, 0.0, 1.0, 0.5, -0.7, 0.2, 0.0, 0.9];
        let expected = network.think(&inputs, &mut rng);
        let actual = restored.think(&inputs, &mut rng);
        assert_eq!(actual.outputs, expected.outputs);
    }

    #[test]
    fn test_stateful_fields_are_serialized() {
        let node = Node::with_inputs(
            NodeId::new("m"),
            NodeKind::Memory { memory_state: 0.25 },
            vec![NodeId::new("x")],
        );
        let json = serde_json::to_value(NodeRecord::from_node(&node)).unwrap();
        assert_eq!(json["type"], "MemoryNode");
        assert_eq!(json["parameters"]["memoryState"], 0.25);
        let back: NodeRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.to_node().unwrap(), node);
    }

    #[test]
    fn test_missing_meta_parameters_are_backfilled() {
        let mut rng = Pcg64Mcg::seed_from_u64(12);
        let network = Network::new(NetworkConfig::default(), &mut rng);
        let mut value = serde_json::to_value(network.to_record()).unwrap();
        let object = value.as_object_mut().unwrap();
        object.remove("mutationStrength");
        object.remove("fitness");
        object.remove("thinkingIterations");
        object["evolvability"]
            .as_object_mut()
            .unwrap()
            .remove("add_node");

        let restored = Network::from_json(&value.to_string(), &mut rng).unwrap();
        assert_eq!(restored.thinking_iterations(), 1);
        assert!(restored.fitness().abs() < 1e-12);
        let add_node = restored.evolvability().get(MutationCategory::AddNode);
        assert!((0.05..0.15).contains(&add_node));
        assert!(
            (restored.evolvability().weights - network.evolvability().weights).abs() < 1e-12
        );
        for cat in MutationCategory::ALL {
            assert!((0.2..0.7).contains(&restored.mutation_strength().get(cat)));
        }
    }

    #[test]
    fn test_unknown_node_type_is_rejected() {
        let mut rng = Pcg64Mcg::seed_from_u64(13);
        let network = Network::new(NetworkConfig::default(), &mut rng);
        let mut record = network.to_record();
        record.nodes.push(NodeRecord {
            id: NodeId::new("bogus"),
            type_tag: "TanhNode".into(),
            inputs: vec![],
            parameters: NodeParameters::default(),
        });
        let err = record.to_network(&mut rng).unwrap_err();
        assert!(matches!(
            err,
            NetworkFormatError::UnknownNodeType { ref type_tag, .. } if type_tag == "TanhNode"
        ));
    }

    #[test]
    fn test_width_and_output_index_are_checked() {
        let mut rng = Pcg64Mcg::seed_from_u64(14);
        let network = Network::new(NetworkConfig::default(), &mut rng);

        let mut short = network.to_record();
        short.input_node_ids.pop();
        assert!(matches!(
            short.to_network(&mut rng),
            Err(NetworkFormatError::WidthMismatch { actual: 8, .. })
        ));

        let mut clash = network.to_record();
        for node in &mut clash.nodes {
            if node.parameters.output_index.is_some() {
                node.parameters.output_index = Some(0);
            }
        }
        assert!(matches!(
            clash.to_network(&mut rng),
            Err(NetworkFormatError::InvalidOutputIndex { .. })
        ));

        assert!(matches!(
            Network::from_json("{", &mut rng),
            Err(NetworkFormatError::Json(_))
        ));
    }

    #[test]
    fn test_null_weight_reads_as_one_and_is_written_back() {
        let record: NodeRecord = serde_json::from_str(
            r#"{"id": "a", "type": "AddNode", "inputs": ["x", "y"], "parameters": {"weights": [null, 2.0]}}"#,
        )
        .unwrap();
        let node = record.to_node().unwrap();
        assert!((node.kind().effective_weight(0) - 1.0).abs() < 1e-12);
        assert!((node.kind().effective_weight(1) - 2.0).abs() < 1e-12);

        let written = serde_json::to_value(NodeRecord::from_node(&node)).unwrap();
        assert_eq!(
            written["parameters"]["weights"],
            serde_json::json!([null, 2.0])
        );
    }
}
