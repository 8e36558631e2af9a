//! The Network Arena
//!
//! [`Network`] owns every node, plug and graph. Everything else refers to
//! them by handle ([`NodeId`], [`PlugId`], [`GraphId`]), so back-references
//! (plug to node, node to graph) and cross-graph connections never form
//! reference cycles.
//!
//! Handles are dense indices and only meaningful for the network that issued
//! them. Accessors index the arena directly and panic on a foreign handle.

use std::collections::HashMap;

use super::expand;
use super::node::{Node, NodeId, NodeSpec, Value};
use super::plug::{Direction, Plug, PlugId};
use super::subgraph::{Graph, GraphId, Member, PlugHost};
use crate::config::NetworkConfig;
use crate::error::{GraphError, Result};

/// Central store of nodes, plugs and graphs.
#[derive(Debug, Clone, Default)]
pub struct Network {
    config: NetworkConfig,

    pub(crate) nodes: Vec<Node>,

    pub(crate) plugs: Vec<Plug>,

    pub(crate) graphs: Vec<Graph>,

    /// Identifier -> member, for nodes and graphs alike.
    identifiers: HashMap<String, Member>,
}

impl Network {
    /// Create an empty network with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty network.
    pub fn with_config(config: NetworkConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    /// Materialise a node.
    ///
    /// Fails if the identifier is taken or the spec pre-assigns an input the
    /// node type does not declare.
    pub fn add_node(&mut self, spec: NodeSpec) -> Result<NodeId> {
        let (kind, name, identifier, values, attributes) = spec.into_parts();

        if self.identifiers.contains_key(&identifier) {
            return Err(GraphError::DuplicateIdentifier(identifier));
        }
        if let Some(unknown) = values.keys().find(|key| !kind.inputs().contains_key(*key)) {
            return Err(GraphError::PlugNotFound {
                owner: name,
                direction: Direction::Input,
                name: unknown.clone(),
            });
        }

        let id = NodeId::from_index(self.nodes.len());
        let mut node = Node::new(identifier.clone(), name, kind.clone(), attributes);

        for (plug_name, default) in kind.inputs() {
            let value = values
                .get(plug_name)
                .cloned()
                .unwrap_or_else(|| default.clone());
            let plug = self.push_plug(Plug::new(plug_name.clone(), id, Direction::Input, value));
            node.add_input(plug_name.clone(), plug);
        }
        for plug_name in kind.outputs() {
            let plug = self.push_plug(Plug::new(
                plug_name.clone(),
                id,
                Direction::Output,
                Value::Null,
            ));
            node.add_output(plug_name.clone(), plug);
        }

        tracing::trace!(node = %node.name(), identifier = %identifier, "added node");
        self.nodes.push(node);
        self.identifiers.insert(identifier, Member::Node(id));
        Ok(id)
    }

    /// Create an empty graph with a generated identifier.
    pub fn create_graph(&mut self, name: impl Into<String>) -> GraphId {
        let identifier = super::node::new_identifier();
        self.insert_graph(identifier, name.into())
    }

    /// Create an empty graph with an explicit identifier.
    pub fn create_graph_with_identifier(
        &mut self,
        identifier: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<GraphId> {
        let identifier = identifier.into();
        if self.identifiers.contains_key(&identifier) {
            return Err(GraphError::DuplicateIdentifier(identifier));
        }
        Ok(self.insert_graph(identifier, name.into()))
    }

    fn insert_graph(&mut self, identifier: String, name: String) -> GraphId {
        let id = GraphId::from_index(self.graphs.len());
        self.graphs.push(Graph::new(identifier.clone(), name));
        self.identifiers.insert(identifier, Member::Graph(id));
        id
    }

    fn push_plug(&mut self, plug: Plug) -> PlugId {
        let id = PlugId::from_index(self.plugs.len());
        self.plugs.push(plug);
        id
    }

    /// Append a node or graph to `graph`.
    ///
    /// A member belongs to at most one graph, and a graph cannot be nested
    /// inside itself or one of its descendants.
    pub fn add_member(&mut self, graph: GraphId, member: impl Into<Member>) -> Result<()> {
        let member = member.into();

        if let Some(owner) = self.owner_of(member) {
            return Err(GraphError::AlreadyMember {
                member: self.member_name(member).to_string(),
                graph: self.graphs[owner.index()].name().to_string(),
            });
        }

        match member {
            Member::Node(node) => self.nodes[node.index()].set_graph(Some(graph)),
            Member::Graph(child) => {
                if self.lineage(graph).any(|ancestor| ancestor == child) {
                    return Err(GraphError::NestingCycle {
                        graph: self.graphs[child.index()].name().to_string(),
                        parent: self.graphs[graph.index()].name().to_string(),
                    });
                }
                self.graphs[child.index()].set_parent(Some(graph));
            }
        }

        self.graphs[graph.index()].push_member(member);
        tracing::trace!(
            graph = %self.graphs[graph.index()].name(),
            member = %self.member_name(member),
            "added member"
        );
        Ok(())
    }

    /// Append several members, stopping at the first failure.
    pub fn add_members<I, M>(&mut self, graph: GraphId, members: I) -> Result<()>
    where
        I: IntoIterator<Item = M>,
        M: Into<Member>,
    {
        for member in members {
            self.add_member(graph, member)?;
        }
        Ok(())
    }

    /// Set an auxiliary attribute read by the node's compute step.
    pub fn set_attribute(&mut self, node: NodeId, key: impl Into<String>, value: Value) {
        self.nodes[node.index()].set_attribute(key.into(), value);
    }

    // ------------------------------------------------------------------------
    // Boundary aliases
    // ------------------------------------------------------------------------

    /// Expose an interior input plug as a boundary input of `graph`.
    pub fn expose_input(
        &mut self,
        graph: GraphId,
        name: impl Into<String>,
        plug: PlugId,
    ) -> Result<()> {
        self.expose(graph, Direction::Input, name.into(), plug)
    }

    /// Expose an interior output plug as a boundary output of `graph`.
    pub fn expose_output(
        &mut self,
        graph: GraphId,
        name: impl Into<String>,
        plug: PlugId,
    ) -> Result<()> {
        self.expose(graph, Direction::Output, name.into(), plug)
    }

    fn expose(
        &mut self,
        graph: GraphId,
        direction: Direction,
        name: String,
        plug: PlugId,
    ) -> Result<()> {
        let target = &self.plugs[plug.index()];
        let reason = if target.direction() != direction {
            Some("plug direction does not match")
        } else if !self.contains(graph, Member::Node(target.owner())) {
            Some("plug owner is not inside the graph")
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(GraphError::InvalidAlias {
                graph: self.graphs[graph.index()].name().to_string(),
                name,
                direction,
                plug: self.describe_plug(plug),
                reason,
            });
        }

        tracing::trace!(
            graph = %self.graphs[graph.index()].name(),
            %direction,
            alias = %name,
            plug = %self.describe_plug(plug),
            "exposed boundary plug"
        );
        self.graphs[graph.index()].bind(direction, name, plug);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------------

    /// A node by handle.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// A plug by handle.
    pub fn plug(&self, id: PlugId) -> &Plug {
        &self.plugs[id.index()]
    }

    /// A graph by handle.
    pub fn graph(&self, id: GraphId) -> &Graph {
        &self.graphs[id.index()]
    }

    /// Number of nodes in the network.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of graphs in the network.
    pub fn graph_count(&self) -> usize {
        self.graphs.len()
    }

    /// The node or graph behind a member handle, as a plug host.
    pub fn host(&self, member: impl Into<Member>) -> &dyn PlugHost {
        match member.into() {
            Member::Node(id) => &self.nodes[id.index()],
            Member::Graph(id) => &self.graphs[id.index()],
        }
    }

    /// Name of a node or graph.
    pub fn member_name(&self, member: impl Into<Member>) -> &str {
        self.host(member).host_name()
    }

    /// Resolve an input plug by name. Graphs resolve through their aliases.
    pub fn input(&self, member: impl Into<Member>, name: &str) -> Result<PlugId> {
        self.resolve(member.into(), Direction::Input, name)
    }

    /// Resolve an output plug by name. Graphs resolve through their aliases.
    pub fn output(&self, member: impl Into<Member>, name: &str) -> Result<PlugId> {
        self.resolve(member.into(), Direction::Output, name)
    }

    fn resolve(&self, member: Member, direction: Direction, name: &str) -> Result<PlugId> {
        let host = self.host(member);
        host.plug(direction, name)
            .ok_or_else(|| GraphError::PlugNotFound {
                owner: host.host_name().to_string(),
                direction,
                name: name.to_string(),
            })
    }

    /// Value currently held by a plug.
    pub fn value(&self, plug: PlugId) -> &Value {
        self.plugs[plug.index()].value()
    }

    /// `node.plug` label used in diagnostics.
    pub fn describe_plug(&self, plug: PlugId) -> String {
        let plug = &self.plugs[plug.index()];
        format!("{}.{}", self.nodes[plug.owner().index()].name(), plug.name())
    }

    /// Find a node or graph anywhere in the network by identifier.
    pub fn find(&self, identifier: &str) -> Option<Member> {
        self.identifiers.get(identifier).copied()
    }

    /// Every node inside `graph`, nested graphs expanded, in member order.
    pub fn all_nodes(&self, graph: GraphId) -> Vec<NodeId> {
        expand::collect_nodes(self, graph)
    }

    /// Whether `member` sits inside `graph`, at any nesting depth.
    pub fn contains(&self, graph: GraphId, member: impl Into<Member>) -> bool {
        match self.owner_of(member.into()) {
            Some(owner) => self.lineage(owner).any(|ancestor| ancestor == graph),
            None => false,
        }
    }

    /// The graph directly holding `member`.
    fn owner_of(&self, member: Member) -> Option<GraphId> {
        match member {
            Member::Node(id) => self.nodes[id.index()].graph(),
            Member::Graph(id) => self.graphs[id.index()].parent(),
        }
    }

    /// `graph` followed by each enclosing graph up to the root.
    fn lineage(&self, graph: GraphId) -> impl Iterator<Item = GraphId> + '_ {
        std::iter::successors(Some(graph), |g| self.graphs[g.index()].parent())
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    /// All nodes named `name` inside `graph`, nested graphs included.
    ///
    /// Names are not unique, so this may return many nodes. An empty result
    /// is reported as [`GraphError::NodeNotFound`].
    pub fn nodes_named(&self, graph: GraphId, name: &str) -> Result<Vec<NodeId>> {
        let found: Vec<NodeId> = self
            .all_nodes(graph)
            .into_iter()
            .filter(|id| self.nodes[id.index()].name() == name)
            .collect();

        if found.is_empty() {
            return Err(GraphError::NodeNotFound {
                graph: self.graphs[graph.index()].name().to_string(),
                name: name.to_string(),
            });
        }
        Ok(found)
    }

    /// The first node named `name` inside `graph`.
    pub fn node_named(&self, graph: GraphId, name: &str) -> Result<NodeId> {
        self.nodes_named(graph, name).map(|found| found[0])
    }

    /// The node with `identifier` inside `graph`.
    pub fn node_by_id(&self, graph: GraphId, identifier: &str) -> Result<NodeId> {
        match self.identifiers.get(identifier) {
            Some(Member::Node(id)) if self.contains(graph, *id) => Ok(*id),
            _ => Err(GraphError::IdentifierNotFound {
                graph: self.graphs[graph.index()].name().to_string(),
                identifier: identifier.to_string(),
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Dirty state
    // ------------------------------------------------------------------------

    /// A node is dirty iff one of its input plugs is dirty.
    pub fn is_node_dirty(&self, node: NodeId) -> bool {
        self.nodes[node.index()]
            .inputs()
            .values()
            .any(|plug| self.plugs[plug.index()].is_dirty())
    }

    /// A graph is dirty iff any node inside it is dirty.
    pub fn is_graph_dirty(&self, graph: GraphId) -> bool {
        self.all_nodes(graph)
            .into_iter()
            .any(|node| self.is_node_dirty(node))
    }

    /// Dirty state of a node or graph.
    pub fn is_dirty(&self, member: impl Into<Member>) -> bool {
        match member.into() {
            Member::Node(id) => self.is_node_dirty(id),
            Member::Graph(id) => self.is_graph_dirty(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::graph::{NodeType, PlugValues};
    use serde_json::json;
    use std::sync::Arc;

    fn multiply() -> Arc<NodeType> {
        NodeType::new("multiply", |ctx| {
            let a = ctx.input("in1")?.as_i64().unwrap_or(0);
            let b = ctx.input("in2")?.as_i64().unwrap_or(0);
            Ok(PlugValues::from([("out".to_string(), json!(a * b))]))
        })
        .with_input("in1", json!(0))
        .with_input("in2", json!(0))
        .with_output("out")
        .build()
    }

    #[test]
    fn add_node_creates_plugs() {
        let mut net = Network::new();
        let id = net.add_node(multiply().spawn().with_input("in1", json!(4))).unwrap();

        let node = net.node(id);
        assert_eq!(node.inputs().len(), 2);
        assert_eq!(node.outputs().len(), 1);
        assert_eq!(net.value(net.input(id, "in1").unwrap()), &json!(4));
        assert_eq!(net.value(net.input(id, "in2").unwrap()), &json!(0));
        assert_eq!(net.plug(net.output(id, "out").unwrap()).owner(), id);
    }

    #[test]
    fn add_node_rejects_unknown_input_override() {
        let mut net = Network::new();
        let err = net
            .add_node(multiply().spawn().with_input("bogus", json!(1)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lookup);
        assert_eq!(net.node_count(), 0);
    }

    #[test]
    fn duplicate_identifier_is_rejected() {
        let mut net = Network::new();
        net.add_node(multiply().spawn().with_identifier("same")).unwrap();
        let err = net
            .add_node(multiply().spawn().with_identifier("same"))
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateIdentifier(ref id) if id == "same"));
    }

    #[test]
    fn member_belongs_to_one_graph() {
        let mut net = Network::new();
        let node = net.add_node(multiply().spawn()).unwrap();
        let g1 = net.create_graph("g1");
        let g2 = net.create_graph("g2");

        net.add_member(g1, node).unwrap();
        let err = net.add_member(g2, node).unwrap_err();
        assert!(matches!(err, GraphError::AlreadyMember { .. }));
        assert_eq!(net.node(node).graph(), Some(g1));
    }

    #[test]
    fn graph_cannot_nest_inside_itself() {
        let mut net = Network::new();
        let outer = net.create_graph("outer");
        let inner = net.create_graph("inner");
        net.add_member(outer, inner).unwrap();

        assert!(matches!(
            net.add_member(inner, outer).unwrap_err(),
            GraphError::NestingCycle { .. }
        ));
        assert!(matches!(
            net.add_member(inner, inner).unwrap_err(),
            GraphError::AlreadyMember { .. }
        ));

        let lonely = net.create_graph("lonely");
        assert!(matches!(
            net.add_member(lonely, lonely).unwrap_err(),
            GraphError::NestingCycle { .. }
        ));
    }

    #[test]
    fn lookup_by_name_and_identifier() {
        let mut net = Network::new();
        let graph = net.create_graph("g");
        let node = net
            .add_node(multiply().spawn().with_name("start").with_identifier("abc"))
            .unwrap();
        net.add_member(graph, node).unwrap();

        assert_eq!(net.nodes_named(graph, "start").unwrap(), vec![node]);
        assert_eq!(net.node_by_id(graph, "abc").unwrap(), node);
        assert_eq!(
            net.node_named(graph, "missing").unwrap_err().kind(),
            ErrorKind::Lookup
        );
        assert_eq!(
            net.node_by_id(graph, "missing").unwrap_err().kind(),
            ErrorKind::Lookup
        );
    }

    #[test]
    fn node_by_id_ignores_nodes_outside_graph() {
        let mut net = Network::new();
        let graph = net.create_graph("g");
        net.add_node(multiply().spawn().with_identifier("outside"))
            .unwrap();
        assert!(net.node_by_id(graph, "outside").is_err());
        assert!(net.find("outside").is_some());
    }

    #[test]
    fn expose_validates_direction_and_containment() {
        let mut net = Network::new();
        let graph = net.create_graph("g");
        let inside = net.add_node(multiply().spawn()).unwrap();
        let outside = net.add_node(multiply().spawn()).unwrap();
        net.add_member(graph, inside).unwrap();

        let in1 = net.input(inside, "in1").unwrap();
        net.expose_input(graph, "a", in1).unwrap();
        assert_eq!(net.input(graph, "a").unwrap(), in1);

        let out = net.output(inside, "out").unwrap();
        assert!(matches!(
            net.expose_input(graph, "b", out).unwrap_err(),
            GraphError::InvalidAlias { .. }
        ));

        let foreign = net.input(outside, "in1").unwrap();
        assert!(matches!(
            net.expose_input(graph, "c", foreign).unwrap_err(),
            GraphError::InvalidAlias { .. }
        ));

        assert_eq!(
            net.output(graph, "nope").unwrap_err().kind(),
            ErrorKind::Lookup
        );
    }

    #[test]
    fn new_nodes_with_inputs_are_dirty() {
        let mut net = Network::new();
        let graph = net.create_graph("g");
        let node = net.add_node(multiply().spawn()).unwrap();
        net.add_member(graph, node).unwrap();
        assert!(net.is_node_dirty(node));
        assert!(net.is_graph_dirty(graph));

        let source = NodeType::new("source", |_| Ok(PlugValues::new())).build();
        let source = net.add_node(source.spawn()).unwrap();
        assert!(!net.is_dirty(source));
    }
}
