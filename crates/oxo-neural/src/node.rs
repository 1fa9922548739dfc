//! Computational units of a [`Network`](crate::Network).
//!
//! A [`Node`] has an identity, a transient value recomputed on every pass, an
//! ordered list of input node ids, and a kind-specific parameter set ([`NodeKind`]).
//! Input order matters for the two-operand kinds: `Subtract` and `Divide` use
//! `inputs[0] (op) inputs[1]`, and `Latch` reads `[data, gate]`.
//!
//! # Evaluation Rules
//!
//! | Kind       | Value                                                          |
//! |------------|----------------------------------------------------------------|
//! | `Input`    | external input at `index`                                      |
//! | `Constant` | stored value, inputs ignored                                   |
//! | `Output`   | first input, or 0 when disconnected                            |
//! | `Add`      | `Σ input[i] × w[i]`                                             |
//! | `Multiply` | `Π input[i] × w[i]`                                             |
//! | `Subtract` | `in0 × w0 − in1 × w1`, or 0 with fewer than two inputs         |
//! | `Divide`   | `in0 × w0 / (in1 × w1)`, 0 on a zero divisor or missing input  |
//! | `Sin/Cos`  | transform of the first input, or 0 when disconnected           |
//! | `Random`   | fresh draw in `[-1, 1]`                                        |
//! | `Memory`   | previous stored value; then stores the current first input     |
//! | `Latch`    | stored value, overwritten by `data` first when `gate > 0.5`    |
//!
//! A weight that is missing or exactly zero counts as `1.0`. Inputs whose source
//! node no longer exists read as `0.0`, and never update `Memory`/`Latch` state.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::random;

/// Opaque node identifier, unique within a network.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    #[must_use]
    pub fn new<S>(id: S) -> Self
    where
        S: Into<String>,
    {
        Self(id.into())
    }

    pub fn random<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self(random::base36_id(rng))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Tag of a [`NodeKind`], as written in the `type` field of the serialized format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum NodeType {
    #[display("InputNode")]
    Input,
    #[display("ConstantNode")]
    Constant,
    #[display("OutputNode")]
    Output,
    #[display("AddNode")]
    Add,
    #[display("SubtractNode")]
    Subtract,
    #[display("MultiplyNode")]
    Multiply,
    #[display("DivideNode")]
    Divide,
    #[display("SinNode")]
    Sin,
    #[display("CosNode")]
    Cos,
    #[display("RandomNode")]
    Random,
    #[display("MemoryNode")]
    Memory,
    #[display("LatchNode")]
    Latch,
}

impl NodeType {
    /// Kinds that evolution may create or switch hidden nodes to.
    pub const HIDDEN: [NodeType; 10] = [
        NodeType::Add,
        NodeType::Subtract,
        NodeType::Multiply,
        NodeType::Divide,
        NodeType::Sin,
        NodeType::Cos,
        NodeType::Constant,
        NodeType::Random,
        NodeType::Memory,
        NodeType::Latch,
    ];

    const ALL: [NodeType; 12] = [
        NodeType::Input,
        NodeType::Constant,
        NodeType::Output,
        NodeType::Add,
        NodeType::Subtract,
        NodeType::Multiply,
        NodeType::Divide,
        NodeType::Sin,
        NodeType::Cos,
        NodeType::Random,
        NodeType::Memory,
        NodeType::Latch,
    ];

    /// Parses a serialized `type` tag such as `"AddNode"`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.to_string() == tag)
    }

    #[must_use]
    pub fn is_weighted(self) -> bool {
        matches!(
            self,
            NodeType::Add | NodeType::Subtract | NodeType::Multiply | NodeType::Divide
        )
    }

    /// Number of inputs the kind reads, or `None` when it reads all of them.
    #[must_use]
    pub fn input_arity(self) -> Option<usize> {
        match self {
            NodeType::Input | NodeType::Constant | NodeType::Random => Some(0),
            NodeType::Output | NodeType::Sin | NodeType::Cos | NodeType::Memory => Some(1),
            NodeType::Subtract | NodeType::Divide | NodeType::Latch => Some(2),
            NodeType::Add | NodeType::Multiply => None,
        }
    }

    /// Whether evolution may add connections into a node of this kind.
    #[must_use]
    pub fn accepts_inputs(self) -> bool {
        !matches!(self, NodeType::Input | NodeType::Constant)
    }

    #[must_use]
    pub fn is_io(self) -> bool {
        matches!(self, NodeType::Input | NodeType::Output)
    }
}

/// Kind-specific parameters of a node.
///
/// A `NaN` weight is unset: it evaluates as 1 and is stored as `null`.
#[derive(Debug, Clone, PartialEq, derive_more::IsVariant)]
pub enum NodeKind {
    Input { index: usize },
    Constant { value: f64 },
    Output { output_index: usize },
    Add { weights: Vec<f64> },
    Subtract { weights: Vec<f64> },
    Multiply { weights: Vec<f64> },
    Divide { weights: Vec<f64> },
    Sin,
    Cos,
    Random,
    Memory { memory_state: f64 },
    Latch { latched_value: f64 },
}

impl NodeKind {
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Input { .. } => NodeType::Input,
            NodeKind::Constant { .. } => NodeType::Constant,
            NodeKind::Output { .. } => NodeType::Output,
            NodeKind::Add { .. } => NodeType::Add,
            NodeKind::Subtract { .. } => NodeType::Subtract,
            NodeKind::Multiply { .. } => NodeType::Multiply,
            NodeKind::Divide { .. } => NodeType::Divide,
            NodeKind::Sin => NodeType::Sin,
            NodeKind::Cos => NodeType::Cos,
            NodeKind::Random => NodeType::Random,
            NodeKind::Memory { .. } => NodeType::Memory,
            NodeKind::Latch { .. } => NodeType::Latch,
        }
    }

    /// Builds a hidden kind with fresh parameters and `weights` for weighted kinds.
    ///
    /// # Panics
    ///
    /// Panics if `node_type` is `Input` or `Output`.
    #[must_use]
    pub fn hidden(node_type: NodeType, weights: Vec<f64>, constant: f64) -> Self {
        match node_type {
            NodeType::Add => NodeKind::Add { weights },
            NodeType::Subtract => NodeKind::Subtract { weights },
            NodeType::Multiply => NodeKind::Multiply { weights },
            NodeType::Divide => NodeKind::Divide { weights },
            NodeType::Sin => NodeKind::Sin,
            NodeType::Cos => NodeKind::Cos,
            NodeType::Random => NodeKind::Random,
            NodeType::Constant => NodeKind::Constant { value: constant },
            NodeType::Memory => NodeKind::Memory { memory_state: 0.0 },
            NodeType::Latch => NodeKind::Latch { latched_value: 0.0 },
            NodeType::Input | NodeType::Output => {
                panic!("{node_type} is not a hidden node type")
            }
        }
    }

    #[must_use]
    pub fn weights(&self) -> Option<&[f64]> {
        match self {
            NodeKind::Add { weights }
            | NodeKind::Subtract { weights }
            | NodeKind::Multiply { weights }
            | NodeKind::Divide { weights } => Some(weights),
            _ => None,
        }
    }

    pub fn weights_mut(&mut self) -> Option<&mut Vec<f64>> {
        match self {
            NodeKind::Add { weights }
            | NodeKind::Subtract { weights }
            | NodeKind::Multiply { weights }
            | NodeKind::Divide { weights } => Some(weights),
            _ => None,
        }
    }

    /// Weight applied to input `index`; `1.0` for unweighted kinds.
    #[must_use]
    pub fn effective_weight(&self, index: usize) -> f64 {
        self.weights()
            .and_then(|w| w.get(index).copied())
            .filter(|w| *w != 0.0 && !w.is_nan())
            .unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    inputs: Vec<NodeId>,
    value: f64,
}

impl Node {
    #[must_use]
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self::with_inputs(id, kind, vec![])
    }

    #[must_use]
    pub fn with_inputs(id: NodeId, kind: NodeKind, inputs: Vec<NodeId>) -> Self {
        Self {
            id,
            kind,
            inputs,
            value: 0.0,
        }
    }

    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    #[must_use]
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    #[must_use]
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut Vec<NodeId> {
        &mut self.inputs
    }

    /// Value produced by the most recent evaluation.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    pub(crate) fn reset_value(&mut self) {
        self.value = 0.0;
    }

    /// Replaces the kind in place, keeping id and inputs.
    pub fn set_kind(&mut self, kind: NodeKind) {
        self.kind = kind;
        self.value = 0.0;
    }

    /// Removes the input at `index` together with its paired weight.
    pub fn remove_input_at(&mut self, index: usize) -> NodeId {
        let removed = self.inputs.remove(index);
        if let Some(weights) = self.kind.weights_mut()
            && index < weights.len()
        {
            weights.remove(index);
        }
        removed
    }

    /// Computes and stores this node's value for the current pass.
    ///
    /// `input_values[i]` is the current value of `inputs[i]`'s source, or `None`
    /// when that source is not part of the graph.
    pub fn evaluate<R>(
        &mut self,
        input_values: &[Option<f64>],
        external_inputs: &[f64],
        rng: &mut R,
    ) -> f64
    where
        R: Rng + ?Sized,
    {
        let read = |i: usize| input_values.get(i).copied().flatten().unwrap_or(0.0);
        let arity = self.inputs.len();

        self.value = match &mut self.kind {
            NodeKind::Memory { memory_state } => {
                let previous = *memory_state;
                if let Some(Some(current)) = input_values.first() {
                    *memory_state = *current;
                }
                previous
            }
            NodeKind::Latch { latched_value } => {
                if let [Some(data), Some(gate), ..] = input_values
                    && *gate > 0.5
                {
                    *latched_value = *data;
                }
                *latched_value
            }
            kind => Self::evaluate_stateless(kind, arity, read, external_inputs, rng),
        };
        self.value
    }

    fn evaluate_stateless<F, R>(
        kind: &NodeKind,
        arity: usize,
        read: F,
        external_inputs: &[f64],
        rng: &mut R,
    ) -> f64
    where
        F: Fn(usize) -> f64,
        R: Rng + ?Sized,
    {
        let weighted = |i: usize| read(i) * kind.effective_weight(i);
        match kind {
            NodeKind::Input { index } => external_inputs.get(*index).copied().unwrap_or(0.0),
            NodeKind::Constant { value } => *value,
            NodeKind::Output { .. } if arity > 0 => read(0),
            NodeKind::Add { .. } => (0..arity).map(weighted).sum(),
            NodeKind::Multiply { .. } => (0..arity).map(weighted).product(),
            NodeKind::Subtract { .. } if arity >= 2 => weighted(0) - weighted(1),
            NodeKind::Divide { .. } if arity >= 2 => {
                let divisor = weighted(1);
                if divisor == 0.0 {
                    0.0
                } else {
                    weighted(0) / divisor
                }
            }
            NodeKind::Sin if arity > 0 => read(0).sin(),
            NodeKind::Cos if arity > 0 => read(0).cos(),
            NodeKind::Random => random::gaussian_signed(rng),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn eval(kind: NodeKind, values: &[Option<f64>]) -> f64 {
        let mut rng = Pcg64Mcg::seed_from_u64(0);
        let inputs = (0..values.len()).map(|i| NodeId::new(format!("n{i}"))).collect();
        let mut node = Node::with_inputs(NodeId::new("t"), kind, inputs);
        node.evaluate(values, &[], &mut rng)
    }

    #[test]
    fn test_type_tags_round_trip() {
        for ty in NodeType::ALL {
            assert_eq!(NodeType::from_tag(&ty.to_string()), Some(ty));
        }
        assert_eq!(NodeType::from_tag("ReluNode"), None);
    }

    #[test]
    fn test_missing_or_zero_weight_reads_as_one() {
        let kind = NodeKind::Add {
            weights: vec![0.0, 2.0],
        };
        assert!((eval(kind, &[Some(3.0), Some(4.0), Some(5.0)]) - 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_arithmetic_edge_cases() {
        assert!((eval(NodeKind::Multiply { weights: vec![] }, &[]) - 1.0).abs() < 1e-12);
        assert!(eval(NodeKind::Subtract { weights: vec![] }, &[Some(2.0)]).abs() < 1e-12);
        assert!(
            eval(
                NodeKind::Divide { weights: vec![] },
                &[Some(1.0), Some(0.0)]
            )
            .abs()
                < 1e-12
        );
        let quotient = eval(
            NodeKind::Divide {
                weights: vec![1.0, 2.0],
            },
            &[Some(6.0), Some(1.5)],
        );
        assert!((quotient - 2.0).abs() < 1e-12);
        assert!(eval(NodeKind::Sin, &[]).abs() < 1e-12);
        assert!((eval(NodeKind::Cos, &[Some(0.0)]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_dangling_input_reads_zero() {
        let kind = NodeKind::Add {
            weights: vec![1.0, 1.0],
        };
        assert!((eval(kind, &[None, Some(2.5)]) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_memory_outputs_previous_value() {
        let mut rng = Pcg64Mcg::seed_from_u64(0);
        let mut node = Node::with_inputs(
            NodeId::new("m"),
            NodeKind::Memory { memory_state: 0.0 },
            vec![NodeId::new("a")],
        );
        assert!(node.evaluate(&[Some(0.7)], &[], &mut rng).abs() < 1e-12);
        assert!((node.evaluate(&[Some(0.2)], &[], &mut rng) - 0.7).abs() < 1e-12);
        assert!((node.evaluate(&[Some(0.0)], &[], &mut rng) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_latch_holds_until_gate_opens() {
        let mut rng = Pcg64Mcg::seed_from_u64(0);
        let mut node = Node::with_inputs(
            NodeId::new("l"),
            NodeKind::Latch { latched_value: 0.0 },
            vec![NodeId::new("d"), NodeId::new("g")],
        );
        assert!(node.evaluate(&[Some(0.8), Some(0.0)], &[], &mut rng).abs() < 1e-12);
        assert!((node.evaluate(&[Some(0.8), Some(1.0)], &[], &mut rng) - 0.8).abs() < 1e-12);
        assert!((node.evaluate(&[Some(0.3), Some(0.5)], &[], &mut rng) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_remove_input_drops_paired_weight() {
        let mut node = Node::with_inputs(
            NodeId::new("a"),
            NodeKind::Add {
                weights: vec![0.1, 0.2, 0.3],
            },
            vec!["x".into(), "y".into(), "z".into()],
        );
        assert_eq!(node.remove_input_at(1), NodeId::new("y"));
        assert_eq!(node.kind().weights(), Some(&[0.1, 0.3][..]));
        assert_eq!(node.inputs(), &[NodeId::new("x"), NodeId::new("z")]);
    }
}
