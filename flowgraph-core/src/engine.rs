//! Evaluation Drivers
//!
//! Walk a graph's evaluation order and evaluate its nodes.
//!
//! - [`Engine::evaluate_all`] evaluates every node in sequence order.
//! - [`Engine::evaluate_dirty`] evaluates a node only if it is dirty when
//!   reached. Evaluating an earlier node can dirty a later one, so the check
//!   happens at each node's turn rather than up front.
//! - [`Engine::evaluate_layered`] walks the layered order. Nodes in one layer
//!   do not depend on each other, so their compute steps run in parallel;
//!   outputs are committed once the whole layer has finished.

use rayon::prelude::*;

use crate::error::{GraphError, Result};
use crate::graph::{GraphId, Network, NodeId, PlugValues};

/// Graph evaluation entry points.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    /// Evaluate every node of `graph`, stopping at the first failure.
    pub fn evaluate_all(network: &mut Network, graph: GraphId) -> Result<()> {
        let span = tracing::debug_span!("evaluate_all", graph = %network.graph(graph).name());
        let _enter = span.enter();

        let sequence = network.evaluation_sequence(graph)?;
        for node in sequence {
            evaluate_one(network, node)?;
        }
        tracing::debug!("graph evaluated");
        Ok(())
    }

    /// Evaluate the nodes of `graph` that are dirty when reached.
    ///
    /// Returns how many nodes were evaluated.
    pub fn evaluate_dirty(network: &mut Network, graph: GraphId) -> Result<usize> {
        let span = tracing::debug_span!("evaluate_dirty", graph = %network.graph(graph).name());
        let _enter = span.enter();

        let sequence = network.evaluation_sequence(graph)?;
        let mut evaluated = 0;
        for node in sequence {
            if network.is_node_dirty(node) {
                evaluate_one(network, node)?;
                evaluated += 1;
            }
        }
        tracing::debug!(evaluated, "dirty nodes evaluated");
        Ok(evaluated)
    }

    /// Evaluate `graph` layer by layer, computing each layer in parallel.
    ///
    /// A failing node does not stop its siblings. The first failure is
    /// returned after the layer has been committed, and later layers are not
    /// started.
    pub fn evaluate_layered(network: &mut Network, graph: GraphId) -> Result<()> {
        let span = tracing::debug_span!("evaluate_layered", graph = %network.graph(graph).name());
        let _enter = span.enter();

        let plan = network.evaluation_plan(graph)?;
        let threshold = network.config().parallel_threshold;

        for (depth, layer) in plan.layers().iter().enumerate() {
            let shared: &Network = network;
            let results: Vec<(NodeId, Result<PlugValues>)> = if layer.len() >= threshold {
                layer
                    .par_iter()
                    .map(|&node| (node, shared.compute_outputs(node)))
                    .collect()
            } else {
                layer
                    .iter()
                    .map(|&node| (node, shared.compute_outputs(node)))
                    .collect()
            };

            let mut first_error: Option<GraphError> = None;
            for (node, result) in results {
                match result {
                    Ok(outputs) => network.commit_outputs(node, &outputs),
                    Err(err) => {
                        tracing::warn!(
                            node = %network.node(node).name(),
                            error = %err,
                            "node evaluation failed"
                        );
                        first_error.get_or_insert(err);
                    }
                }
            }
            tracing::trace!(depth, nodes = layer.len(), "layer evaluated");

            if let Some(err) = first_error {
                return Err(err);
            }
        }
        Ok(())
    }
}

fn evaluate_one(network: &mut Network, node: NodeId) -> Result<()> {
    network.evaluate(node).map(drop).map_err(|err| {
        tracing::warn!(
            node = %network.node(node).name(),
            error = %err,
            "node evaluation failed"
        );
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::error::ComputeError;
    use crate::graph::NodeType;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Adds one to its input and counts its calls.
    fn increment(calls: &Arc<AtomicUsize>) -> Arc<NodeType> {
        let calls = Arc::clone(calls);
        NodeType::new("increment", move |ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            let value = ctx.input("in")?.as_i64().unwrap_or(0);
            Ok(PlugValues::from([("out".to_string(), json!(value + 1))]))
        })
        .with_input("in", json!(0))
        .with_output("out")
        .build()
    }

    /// a -> b -> c, plus an unconnected d.
    fn chain(net: &mut Network, ty: &Arc<NodeType>) -> (GraphId, Vec<NodeId>) {
        let graph = net.create_graph("chain");
        let nodes: Vec<NodeId> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|name| net.add_node(ty.spawn().with_name(name)).unwrap())
            .collect();
        net.add_members(graph, nodes.iter().copied()).unwrap();
        for pair in nodes[..3].windows(2) {
            let out = net.output(pair[0], "out").unwrap();
            let input = net.input(pair[1], "in").unwrap();
            net.connect(out, input).unwrap();
        }
        (graph, nodes)
    }

    #[test]
    fn evaluate_all_runs_every_node_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut net = Network::new();
        let (graph, nodes) = chain(&mut net, &increment(&calls));

        Engine::evaluate_all(&mut net, graph).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(net.output_values(nodes[2])["out"], json!(3));
        assert!(!net.is_graph_dirty(graph));

        Engine::evaluate_all(&mut net, graph).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn evaluate_dirty_skips_clean_nodes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut net = Network::new();
        let (graph, nodes) = chain(&mut net, &increment(&calls));

        assert_eq!(Engine::evaluate_dirty(&mut net, graph).unwrap(), 4);
        assert_eq!(Engine::evaluate_dirty(&mut net, graph).unwrap(), 0);

        // Only `a` is dirty up front; `b` and `c` turn dirty as it runs.
        net.set_value(net.input(nodes[0], "in").unwrap(), json!(10))
            .unwrap();
        assert_eq!(Engine::evaluate_dirty(&mut net, graph).unwrap(), 3);
        assert_eq!(net.output_values(nodes[2])["out"], json!(13));
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn clean_graph_is_stable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut net = Network::new();
        let (graph, nodes) = chain(&mut net, &increment(&calls));
        Engine::evaluate_all(&mut net, graph).unwrap();
        let before: Vec<_> = nodes.iter().map(|n| net.output_values(*n)).collect();

        Engine::evaluate_all(&mut net, graph).unwrap();
        let after: Vec<_> = nodes.iter().map(|n| net.output_values(*n)).collect();
        assert_eq!(before, after);
        assert!(!net.is_graph_dirty(graph));
    }

    #[test]
    fn layered_matches_sequential() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ty = increment(&calls);

        let mut sequential = Network::new();
        let (graph, nodes) = chain(&mut sequential, &ty);
        Engine::evaluate_all(&mut sequential, graph).unwrap();

        let mut layered = Network::with_config(NetworkConfig {
            parallel_threshold: 1,
            ..NetworkConfig::default()
        });
        let (layered_graph, layered_nodes) = chain(&mut layered, &ty);
        Engine::evaluate_layered(&mut layered, layered_graph).unwrap();

        for (a, b) in nodes.iter().zip(&layered_nodes) {
            assert_eq!(sequential.output_values(*a), layered.output_values(*b));
        }
        assert!(!layered.is_graph_dirty(layered_graph));
    }

    #[test]
    fn layered_commits_siblings_of_a_failure() {
        let fail = NodeType::new("fail", |_| Err(ComputeError::failed("nope")))
            .with_input("in", json!(0))
            .with_output("out")
            .build();
        let calls = Arc::new(AtomicUsize::new(0));
        let ok = increment(&calls);

        let mut net = Network::new();
        let graph = net.create_graph("g");
        let bad = net.add_node(fail.spawn()).unwrap();
        let good = net.add_node(ok.spawn()).unwrap();
        let after = net.add_node(ok.spawn()).unwrap();
        net.add_members(graph, [bad, good, after]).unwrap();
        net.connect(net.output(good, "out").unwrap(), net.input(after, "in").unwrap())
            .unwrap();

        let err = Engine::evaluate_layered(&mut net, graph).unwrap_err();
        assert!(matches!(err, GraphError::Compute { .. }));
        assert_eq!(net.output_values(good)["out"], json!(1));
        assert!(net.is_node_dirty(bad));
        // The second layer never ran.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(net.is_node_dirty(after));
    }

    #[test]
    fn evaluate_all_reports_cycles() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ty = increment(&calls);
        let mut net = Network::new();
        let graph = net.create_graph("loop");
        let a = net.add_node(ty.spawn()).unwrap();
        let b = net.add_node(ty.spawn()).unwrap();
        net.add_members(graph, [a, b]).unwrap();
        net.connect(net.output(a, "out").unwrap(), net.input(b, "in").unwrap())
            .unwrap();
        net.connect(net.output(b, "out").unwrap(), net.input(a, "in").unwrap())
            .unwrap();

        assert!(matches!(
            Engine::evaluate_all(&mut net, graph).unwrap_err(),
            GraphError::Cycle { .. }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
