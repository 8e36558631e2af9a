//! Graphs as Members
//!
//! A [`Graph`] is an ordered collection of members, each either a node or
//! another graph. A graph can stand in for a node inside its parent: it
//! exposes named boundary plugs that alias plugs of interior nodes.
//!
//! Boundary plugs hold no storage of their own. Looking one up through
//! [`PlugHost`] yields the interior [`PlugId`] it was bound to, so every
//! connection or assignment made through a boundary name lands on the real
//! interior plug.

use indexmap::IndexMap;

use super::node::{Node, NodeId};
use super::plug::{Direction, PlugId};

/// Handle to a graph inside a [`Network`](super::Network).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(u32);

impl GraphId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of the graph in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Something a graph can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Member {
    /// A plain node.
    Node(NodeId),
    /// A nested graph.
    Graph(GraphId),
}

impl From<NodeId> for Member {
    fn from(id: NodeId) -> Self {
        Member::Node(id)
    }
}

impl From<GraphId> for Member {
    fn from(id: GraphId) -> Self {
        Member::Graph(id)
    }
}

/// Anything with named input and output plugs.
///
/// Nodes answer from their own plugs; graphs answer through their boundary
/// aliases.
pub trait PlugHost {
    /// Human label used in diagnostics.
    fn host_name(&self) -> &str;

    /// Stable identifier.
    fn host_identifier(&self) -> &str;

    /// Plugs on one side, by name.
    fn plugs(&self, direction: Direction) -> &IndexMap<String, PlugId>;

    /// Resolve a plug name on one side.
    fn plug(&self, direction: Direction, name: &str) -> Option<PlugId> {
        self.plugs(direction).get(name).copied()
    }
}

impl PlugHost for Node {
    fn host_name(&self) -> &str {
        self.name()
    }

    fn host_identifier(&self) -> &str {
        self.identifier()
    }

    fn plugs(&self, direction: Direction) -> &IndexMap<String, PlugId> {
        match direction {
            Direction::Input => self.inputs(),
            Direction::Output => self.outputs(),
        }
    }
}

/// A graph stored in the network.
#[derive(Debug, Clone)]
pub struct Graph {
    /// Globally unique, stable across serialization.
    identifier: String,

    name: String,

    /// Members in insertion order.
    members: Vec<Member>,

    /// Boundary inputs: name -> interior input plug.
    inputs: IndexMap<String, PlugId>,

    /// Boundary outputs: name -> interior output plug.
    outputs: IndexMap<String, PlugId>,

    /// The graph this graph is nested in.
    parent: Option<GraphId>,
}

impl Graph {
    pub(crate) fn new(identifier: String, name: String) -> Self {
        Self {
            identifier,
            name,
            members: Vec::new(),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            parent: None,
        }
    }

    /// The graph's identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The graph's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct members in insertion order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Boundary input aliases.
    pub fn inputs(&self) -> &IndexMap<String, PlugId> {
        &self.inputs
    }

    /// Boundary output aliases.
    pub fn outputs(&self) -> &IndexMap<String, PlugId> {
        &self.outputs
    }

    /// The enclosing graph, if nested.
    pub fn parent(&self) -> Option<GraphId> {
        self.parent
    }

    pub(crate) fn push_member(&mut self, member: Member) {
        self.members.push(member);
    }

    pub(crate) fn set_parent(&mut self, parent: Option<GraphId>) {
        self.parent = parent;
    }

    pub(crate) fn bind(&mut self, direction: Direction, name: String, plug: PlugId) {
        match direction {
            Direction::Input => self.inputs.insert(name, plug),
            Direction::Output => self.outputs.insert(name, plug),
        };
    }
}

impl PlugHost for Graph {
    fn host_name(&self) -> &str {
        &self.name
    }

    fn host_identifier(&self) -> &str {
        &self.identifier
    }

    fn plugs(&self, direction: Direction) -> &IndexMap<String, PlugId> {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }
}
