//! Subgraph Expansion
//!
//! Ordering never treats a nested graph as an opaque unit. Before sorting,
//! the graph is flattened: every node of every nested graph joins the same
//! node set as its parent's direct members, and the dependency edges between
//! them are read straight off the plugs.
//!
//! Boundary plugs are aliases resolved when a connection is made, so a
//! connection that crosses a subgraph boundary is already stored between the
//! real interior plug and the real exterior plug. Expansion only has to pick
//! the edges whose both ends fall inside the flattened set; edges leaving the
//! set (to nodes of an enclosing graph, say) are ignored for this ordering.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::network::Network;
use super::node::NodeId;
use super::plug::PlugId;
use super::subgraph::{GraphId, Member};

/// One resolved connection between two real plugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    /// The upstream output plug.
    pub from: PlugId,
    /// The downstream input plug.
    pub to: PlugId,
}

/// A nested graph flattened into a plain dependency graph.
#[derive(Debug, Clone, Default)]
pub(crate) struct FlatGraph {
    /// Every node, in depth-first member order.
    pub(crate) nodes: Vec<NodeId>,

    /// node -> distinct upstream nodes inside the set.
    pub(crate) upstream: HashMap<NodeId, SmallVec<[NodeId; 4]>>,

    /// node -> distinct downstream nodes inside the set.
    pub(crate) downstream: HashMap<NodeId, SmallVec<[NodeId; 4]>>,
}

impl FlatGraph {
    /// Flatten `graph` and all graphs nested in it.
    pub(crate) fn build(network: &Network, graph: GraphId) -> Self {
        let nodes = collect_nodes(network, graph);
        let members: HashSet<NodeId> = nodes.iter().copied().collect();

        let mut upstream: HashMap<NodeId, SmallVec<[NodeId; 4]>> = HashMap::new();
        let mut downstream: HashMap<NodeId, SmallVec<[NodeId; 4]>> = HashMap::new();

        for &node in &nodes {
            let sources: IndexSet<NodeId> = network
                .node(node)
                .inputs()
                .values()
                .filter_map(|plug| network.plug(*plug).upstream())
                .map(|source| network.plug(source).owner())
                .filter(|owner| members.contains(owner))
                .collect();

            for &source in &sources {
                downstream.entry(source).or_default().push(node);
            }
            upstream.insert(node, sources.into_iter().collect());
        }

        Self {
            nodes,
            upstream,
            downstream,
        }
    }

    /// Distinct upstream nodes of `node` inside the set.
    pub(crate) fn upstream_of(&self, node: NodeId) -> &[NodeId] {
        self.upstream
            .get(&node)
            .map(|deps| deps.as_slice())
            .unwrap_or(&[])
    }

    /// Distinct downstream nodes of `node` inside the set.
    pub(crate) fn downstream_of(&self, node: NodeId) -> &[NodeId] {
        self.downstream
            .get(&node)
            .map(|deps| deps.as_slice())
            .unwrap_or(&[])
    }
}

/// Every node inside `graph`, nested graphs expanded depth-first.
pub(crate) fn collect_nodes(network: &Network, graph: GraphId) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    push_nodes(network, graph, &mut nodes);
    nodes
}

// Nesting is acyclic (enforced by `add_member`), so plain recursion terminates.
fn push_nodes(network: &Network, graph: GraphId, nodes: &mut Vec<NodeId>) {
    for member in network.graph(graph).members() {
        match *member {
            Member::Node(id) => nodes.push(id),
            Member::Graph(child) => push_nodes(network, child, nodes),
        }
    }
}

impl Network {
    /// Every connection whose two ends both lie inside `graph`, nested graphs
    /// included, in output-plug order.
    pub fn connections(&self, graph: GraphId) -> Vec<Connection> {
        let nodes: HashSet<NodeId> = self.all_nodes(graph).into_iter().collect();
        let mut connections = Vec::new();
        for node in self.all_nodes(graph) {
            for &from in self.node(node).outputs().values() {
                for &to in self.plug(from).connections() {
                    if nodes.contains(&self.plug(to).owner()) {
                        connections.push(Connection { from, to });
                    }
                }
            }
        }
        connections
    }
}
