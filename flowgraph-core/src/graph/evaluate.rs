//! Node Evaluation
//!
//! Evaluating a node is split in two phases:
//!
//! 1. **Compute** (`&self`): gather the input values, run the compute step,
//!    and check that every declared output was produced. Nothing is written.
//! 2. **Commit** (`&mut self`): store each output, push it to every connected
//!    input (which turns dirty if the value changed), then clear the node's
//!    own input dirty flags.
//!
//! A failure in phase 1 therefore leaves the network untouched. The split
//! also lets the layered driver run many compute phases concurrently over a
//! shared borrow and commit afterwards.

use super::network::Network;
use super::node::{ComputeContext, NodeId, PlugValues};
use crate::error::{GraphError, Result};

impl Network {
    /// Evaluate one node and return its declared outputs.
    pub fn evaluate(&mut self, node: NodeId) -> Result<PlugValues> {
        let outputs = self.compute_outputs(node)?;
        self.commit_outputs(node, &outputs);
        Ok(outputs)
    }

    /// Snapshot the node's input values by plug name.
    pub fn input_values(&self, node: NodeId) -> PlugValues {
        self.nodes[node.index()]
            .inputs()
            .iter()
            .map(|(name, plug)| (name.clone(), self.plugs[plug.index()].value().clone()))
            .collect()
    }

    /// Snapshot the node's output values by plug name.
    pub fn output_values(&self, node: NodeId) -> PlugValues {
        self.nodes[node.index()]
            .outputs()
            .iter()
            .map(|(name, plug)| (name.clone(), self.plugs[plug.index()].value().clone()))
            .collect()
    }

    /// Run the compute step without touching any plug.
    ///
    /// The result holds exactly the declared outputs, in declaration order.
    pub(crate) fn compute_outputs(&self, id: NodeId) -> Result<PlugValues> {
        let node = &self.nodes[id.index()];
        let inputs = self.input_values(id);

        tracing::debug!(
            node = %node.name(),
            identifier = %node.identifier(),
            dirty = self.is_node_dirty(id),
            "evaluating node"
        );

        let ctx = ComputeContext::new(node, &inputs);
        let mut produced = node
            .kind()
            .run(&ctx)
            .map_err(|source| GraphError::Compute {
                node: node.name().to_string(),
                source,
            })?;

        let mut outputs = PlugValues::with_capacity(node.outputs().len());
        for name in node.outputs().keys() {
            match produced.swap_remove(name) {
                Some(value) => {
                    outputs.insert(name.clone(), value);
                }
                None => {
                    return Err(GraphError::MissingOutput {
                        node: node.name().to_string(),
                        output: name.clone(),
                    });
                }
            }
        }
        if !produced.is_empty() {
            tracing::trace!(
                node = %node.name(),
                extra = ?produced.keys().collect::<Vec<_>>(),
                "ignoring undeclared outputs"
            );
        }
        Ok(outputs)
    }

    /// Write computed outputs, push them one hop, and clean the node.
    pub(crate) fn commit_outputs(&mut self, id: NodeId, outputs: &PlugValues) {
        let node = &self.nodes[id.index()];
        let writes: Vec<_> = node
            .outputs()
            .iter()
            .filter_map(|(name, plug)| outputs.get(name).map(|value| (*plug, value)))
            .collect();
        let inputs: Vec<_> = node.inputs().values().copied().collect();

        for (plug, value) in writes {
            self.plugs[plug.index()].commit(value.clone());
            let downstream = self.plugs[plug.index()].connections().to_vec();
            for target in downstream {
                self.plugs[target.index()].assign(value.clone());
            }
        }

        for plug in inputs {
            self.plugs[plug.index()].set_dirty(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ComputeError, ErrorKind};
    use crate::graph::NodeType;
    use serde_json::json;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    fn multiply(net: &mut Network, name: &str) -> NodeId {
        let ty = NodeType::new("multiply", |ctx| {
            let a = ctx.input("in1")?.as_i64().unwrap_or(0);
            let b = ctx.input("in2")?.as_i64().unwrap_or(0);
            Ok(PlugValues::from([("out".to_string(), json!(a * b))]))
        })
        .with_input("in1", json!(0))
        .with_input("in2", json!(0))
        .with_output("out")
        .build();
        net.add_node(ty.spawn().with_name(name)).unwrap()
    }

    #[test]
    fn evaluate_computes_and_cleans() {
        let mut net = Network::new();
        let n = multiply(&mut net, "n");
        net.set_value(net.input(n, "in1").unwrap(), json!(3)).unwrap();
        net.set_value(net.input(n, "in2").unwrap(), json!(2)).unwrap();

        let outputs = net.evaluate(n).unwrap();
        assert_eq!(outputs["out"], json!(6));
        assert_eq!(net.output_values(n)["out"], json!(6));
        assert!(!net.is_node_dirty(n));
    }

    #[test]
    fn evaluate_pushes_to_every_connected_input() {
        let mut net = Network::new();
        let src = multiply(&mut net, "src");
        let left = multiply(&mut net, "left");
        let right = multiply(&mut net, "right");
        net.set_value(net.input(src, "in1").unwrap(), json!(4)).unwrap();
        net.set_value(net.input(src, "in2").unwrap(), json!(5)).unwrap();

        let out = net.output(src, "out").unwrap();
        net.connect(out, net.input(left, "in1").unwrap()).unwrap();
        net.connect(out, net.input(right, "in2").unwrap()).unwrap();
        net.evaluate(left).unwrap();
        net.evaluate(right).unwrap();
        assert!(!net.is_node_dirty(left));

        net.evaluate(src).unwrap();
        assert_eq!(net.value(net.input(left, "in1").unwrap()), &json!(20));
        assert_eq!(net.value(net.input(right, "in2").unwrap()), &json!(20));
        assert!(net.is_node_dirty(left));
        assert!(net.is_node_dirty(right));
    }

    #[test]
    fn unchanged_output_does_not_dirty_downstream() {
        let mut net = Network::new();
        let a = multiply(&mut net, "a");
        let b = multiply(&mut net, "b");
        net.connect(net.output(a, "out").unwrap(), net.input(b, "in1").unwrap())
            .unwrap();

        net.evaluate(a).unwrap();
        net.evaluate(b).unwrap();
        assert!(!net.is_node_dirty(b));

        net.evaluate(a).unwrap();
        assert!(!net.is_node_dirty(b));
    }

    #[test]
    fn failing_compute_leaves_state_untouched() {
        let mut net = Network::new();
        let ty = NodeType::new("fails", |_| Err(ComputeError::failed("boom")))
            .with_input("in", json!(1))
            .with_output("out")
            .build();
        let n = net.add_node(ty.spawn()).unwrap();

        let err = net.evaluate(n).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Compute);
        assert!(net.is_node_dirty(n));
        assert_eq!(net.output_values(n)["out"], json!(null));
    }

    #[test]
    fn missing_declared_output_is_an_error() {
        let mut net = Network::new();
        let ty = NodeType::new("partial", |_| {
            Ok(PlugValues::from([("a".to_string(), json!(1))]))
        })
        .with_input("in", json!(0))
        .with_output("a")
        .with_output("b")
        .build();
        let n = net.add_node(ty.spawn()).unwrap();

        let err = net.evaluate(n).unwrap_err();
        assert!(matches!(err, GraphError::MissingOutput { ref output, .. } if output == "b"));
        assert!(net.is_node_dirty(n));
        assert_eq!(net.output_values(n)["a"], json!(null));
    }

    #[test]
    fn undeclared_outputs_are_dropped() {
        let mut net = Network::new();
        let ty = NodeType::new("extra", |_| {
            Ok(PlugValues::from([
                ("b".to_string(), json!(2)),
                ("a".to_string(), json!(1)),
                ("zzz".to_string(), json!(0)),
            ]))
        })
        .with_output("a")
        .with_output("b")
        .build();
        let n = net.add_node(ty.spawn()).unwrap();

        let outputs = net.evaluate(n).unwrap();
        assert_eq!(outputs.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn compute_reads_node_attributes() {
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();
        let ty = NodeType::new("attr", move |ctx| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            let test = ctx.attribute("test").cloned().unwrap_or_default();
            Ok(PlugValues::from([("test".to_string(), test)]))
        })
        .with_output("test")
        .build();

        let mut net = Network::new();
        let n = net.add_node(ty.spawn()).unwrap();
        net.set_attribute(n, "test", json!("test"));

        assert_eq!(net.evaluate(n).unwrap()["test"], json!("test"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
