//! Evaluation Order
//!
//! The scheduler decides the order in which the nodes of a graph are
//! evaluated. Every node comes after all of its upstream nodes.
//!
//! # Algorithm
//!
//! Kahn's algorithm, run in rounds over the flattened graph (see
//! `expand.rs`):
//!
//! 1. Count, for every node, its distinct upstream nodes inside the set
//! 2. Round 0 takes every node with a count of zero
//! 3. Placing a round decrements the count of each downstream node
//! 4. The nodes that reach zero during a round form the next round
//! 5. Stop when a round is empty
//!
//! A node joins the round right after the last of its upstream nodes, so
//! the rounds are exactly the longest-path layers. The flat sequence is the
//! rounds concatenated. Nodes inside one round keep their depth-first
//! member order.
//!
//! Nodes still unplaced once the rounds run dry sit on a cycle (or behind
//! one); that is reported instead of returning a partial order.

use std::collections::HashMap;

use super::expand::FlatGraph;
use super::network::Network;
use super::node::NodeId;
use super::subgraph::GraphId;
use crate::error::{GraphError, Result};

/// Layered evaluation order of one graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationPlan {
    layers: Vec<Vec<NodeId>>,
}

impl EvaluationPlan {
    /// Layer `k` holds the nodes whose longest upstream path has length `k`.
    pub fn layers(&self) -> &[Vec<NodeId>] {
        &self.layers
    }

    /// All nodes, layer by layer.
    pub fn sequence(&self) -> Vec<NodeId> {
        self.layers.iter().flatten().copied().collect()
    }

    /// Number of layers.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Number of nodes across all layers.
    pub fn len(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn into_layers(self) -> Vec<Vec<NodeId>> {
        self.layers
    }
}

impl Network {
    /// Compute the layered evaluation order of `graph`, nested graphs
    /// expanded.
    pub fn evaluation_plan(&self, graph: GraphId) -> Result<EvaluationPlan> {
        let flat = FlatGraph::build(self, graph);

        let position: HashMap<NodeId, usize> = flat
            .nodes
            .iter()
            .enumerate()
            .map(|(index, &node)| (node, index))
            .collect();

        let mut in_degree: HashMap<NodeId, usize> = flat
            .nodes
            .iter()
            .map(|&node| (node, flat.upstream_of(node).len()))
            .collect();

        let mut layers = Vec::new();
        let mut current: Vec<NodeId> = flat
            .nodes
            .iter()
            .copied()
            .filter(|node| in_degree[node] == 0)
            .collect();
        let mut placed = 0;

        while !current.is_empty() {
            let mut next = Vec::new();
            for &node in &current {
                for &dependent in flat.downstream_of(node) {
                    if let Some(degree) = in_degree.get_mut(&dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(dependent);
                        }
                    }
                }
            }
            next.sort_by_key(|node| position[node]);

            placed += current.len();
            layers.push(std::mem::replace(&mut current, next));
        }

        if placed < flat.nodes.len() {
            let nodes: Vec<String> = flat
                .nodes
                .iter()
                .filter(|node| in_degree[*node] > 0)
                .map(|node| self.node(*node).name().to_string())
                .collect();
            tracing::debug!(
                graph = %self.graph(graph).name(),
                unplaced = nodes.len(),
                "connection cycle"
            );
            return Err(GraphError::Cycle { nodes });
        }

        tracing::trace!(
            graph = %self.graph(graph).name(),
            nodes = placed,
            layers = layers.len(),
            "computed evaluation plan"
        );
        Ok(EvaluationPlan { layers })
    }

    /// Flat evaluation order: for every connection `a -> b`, `a` comes first.
    pub fn evaluation_sequence(&self, graph: GraphId) -> Result<Vec<NodeId>> {
        self.evaluation_plan(graph).map(|plan| plan.sequence())
    }

    /// Layered evaluation order. Nodes in one layer do not depend on each
    /// other.
    pub fn evaluation_matrix(&self, graph: GraphId) -> Result<Vec<Vec<NodeId>>> {
        self.evaluation_plan(graph).map(EvaluationPlan::into_layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::graph::{NodeType, PlugValues};
    use serde_json::json;
    use std::sync::Arc;

    fn kind() -> Arc<NodeType> {
        NodeType::new("node", |_| Ok(PlugValues::from([("out".to_string(), json!(0))])))
            .with_input("in1", json!(0))
            .with_input("in2", json!(0))
            .with_output("out")
            .build()
    }

    struct Fixture {
        net: Network,
        graph: GraphId,
        ty: Arc<NodeType>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut net = Network::new();
            let graph = net.create_graph("g");
            Self {
                net,
                graph,
                ty: kind(),
            }
        }

        fn node(&mut self, name: &str) -> NodeId {
            let id = self.net.add_node(self.ty.spawn().with_name(name)).unwrap();
            self.net.add_member(self.graph, id).unwrap();
            id
        }

        fn wire(&mut self, from: NodeId, to: NodeId, input: &str) {
            let out = self.net.output(from, "out").unwrap();
            let input = self.net.input(to, input).unwrap();
            self.net.connect(out, input).unwrap();
        }

        fn names(&self, layers: &[Vec<NodeId>]) -> Vec<Vec<String>> {
            layers
                .iter()
                .map(|layer| {
                    let mut names: Vec<String> = layer
                        .iter()
                        .map(|id| self.net.node(*id).name().to_string())
                        .collect();
                    names.sort();
                    names
                })
                .collect()
        }
    }

    #[test]
    fn linear_chain_is_exact() {
        let mut fx = Fixture::new();
        // Added out of order on purpose.
        let n3 = fx.node("n3");
        let n1 = fx.node("n1");
        let n2 = fx.node("n2");
        fx.wire(n1, n2, "in1");
        fx.wire(n2, n3, "in1");

        assert_eq!(fx.net.evaluation_sequence(fx.graph).unwrap(), vec![n1, n2, n3]);
    }

    #[test]
    fn branching_graph_layers_by_longest_path() {
        let mut fx = Fixture::new();
        let start = fx.node("start");
        let n11 = fx.node("n11");
        let n12 = fx.node("n12");
        let n21 = fx.node("n21");
        let n31 = fx.node("n31");
        let n32 = fx.node("n32");
        let n33 = fx.node("n33");
        let end = fx.node("end");

        fx.wire(start, n11, "in1");
        fx.wire(start, n21, "in1");
        fx.wire(start, n31, "in1");
        fx.wire(n31, n32, "in1");
        fx.wire(n32, n33, "in1");
        fx.wire(n11, n12, "in1");
        fx.wire(n33, n12, "in2");
        fx.wire(n12, end, "in1");
        fx.wire(n21, end, "in2");

        let matrix = fx.net.evaluation_matrix(fx.graph).unwrap();
        assert_eq!(
            fx.names(&matrix),
            vec![
                vec!["start"],
                vec!["n11", "n21", "n31"],
                vec!["n32"],
                vec!["n33"],
                vec!["n12"],
                vec!["end"],
            ]
        );

        let sequence = fx.net.evaluation_sequence(fx.graph).unwrap();
        assert_eq!(sequence.len(), 8);
        assert_eq!(sequence[0], start);
        assert!(sequence[1..4].contains(&n21));
        assert_eq!(sequence[7], end);
    }

    #[test]
    fn unconnected_nodes_share_layer_zero() {
        let mut fx = Fixture::new();
        let a = fx.node("a");
        let b = fx.node("b");
        let c = fx.node("c");

        let plan = fx.net.evaluation_plan(fx.graph).unwrap();
        assert_eq!(plan.depth(), 1);
        assert_eq!(plan.sequence(), vec![a, b, c]);
    }

    #[test]
    fn empty_graph_has_empty_plan() {
        let fx = Fixture::new();
        let plan = fx.net.evaluation_plan(fx.graph).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
    }

    #[test]
    fn cycle_is_a_structural_error() {
        let mut fx = Fixture::new();
        let root = fx.node("root");
        let a = fx.node("a");
        let b = fx.node("b");
        fx.wire(root, a, "in1");
        fx.wire(a, b, "in1");
        fx.wire(b, a, "in2");

        let err = fx.net.evaluation_sequence(fx.graph).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        match err {
            GraphError::Cycle { mut nodes } => {
                nodes.sort();
                assert_eq!(nodes, vec!["a", "b"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(fx.net.evaluation_matrix(fx.graph).is_err());
    }

    #[test]
    fn fan_in_counts_each_upstream_once() {
        let mut fx = Fixture::new();
        let a = fx.node("a");
        let b = fx.node("b");
        fx.wire(a, b, "in1");
        fx.wire(a, b, "in2");

        let plan = fx.net.evaluation_plan(fx.graph).unwrap();
        assert_eq!(plan.layers(), &[vec![a], vec![b]]);
    }
}
