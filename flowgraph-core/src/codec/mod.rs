//! Graph Serialization
//!
//! Converts a graph to a plain nested structure and back. The structure
//! holds only maps, sequences and primitives, so it encodes to JSON or
//! MessagePack unchanged.
//!
//! # Format
//!
//! ```text
//! graph   { identifier, name, nodes: [member], inputs?, outputs? }
//! member  { kind: "node", ...node } | { kind: "graph", ...graph }
//! node    { identifier, name, doc, type, inputs, outputs, attributes? }
//! plug    { value, connections: [{ name, node_identifier }] }
//! alias   { plug, node_identifier }
//! ```
//!
//! Only connections whose two ends lie inside the serialized graph are
//! recorded. On the way back nodes are rebuilt through a [`NodeRegistry`]
//! by their `type` tag, and connections are re-established by node
//! identifier.

mod registry;

pub use registry::NodeRegistry;

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result, SerializationError};
use crate::graph::{Direction, GraphId, Member, Network, NodeId, PlugHost, PlugId, Value};

/// A serialized graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedGraph {
    pub identifier: String,
    pub name: String,

    /// Members in insertion order.
    pub nodes: Vec<SerializedMember>,

    /// Boundary input aliases.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: IndexMap<String, SerializedAlias>,

    /// Boundary output aliases.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, SerializedAlias>,
}

/// A graph member: a node or a nested graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SerializedMember {
    Node(SerializedNode),
    Graph(SerializedGraph),
}

/// A serialized node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,

    /// Registry tag of the node type.
    #[serde(rename = "type")]
    pub node_type: String,

    pub inputs: IndexMap<String, SerializedPlug>,
    pub outputs: IndexMap<String, SerializedPlug>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, Value>,
}

/// A serialized plug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedPlug {
    pub value: Value,
    #[serde(default)]
    pub connections: Vec<PlugRef>,
}

/// The far end of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlugRef {
    /// Plug name on the far node.
    pub name: String,
    pub node_identifier: String,
}

/// The interior plug behind a boundary alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedAlias {
    pub plug: String,
    pub node_identifier: String,
}

impl SerializedGraph {
    pub fn to_json(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SerializationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// MessagePack with named fields.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, SerializationError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, SerializationError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Node identifiers in depth-first member order.
    pub fn node_identifiers(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.visit_nodes(&mut |node| out.push(node.identifier.as_str()));
        out
    }

    fn visit_nodes<'a>(&'a self, f: &mut impl FnMut(&'a SerializedNode)) {
        for member in &self.nodes {
            match member {
                SerializedMember::Node(node) => f(node),
                SerializedMember::Graph(graph) => graph.visit_nodes(f),
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Encoding
// ----------------------------------------------------------------------------

/// Capture `graph`, its nested graphs and the connections among them.
pub fn serialize(network: &Network, graph: GraphId) -> SerializedGraph {
    let inside: HashSet<NodeId> = network.all_nodes(graph).into_iter().collect();
    let serialized = encode_graph(network, graph, &inside);
    tracing::debug!(
        graph = %serialized.name,
        nodes = inside.len(),
        "serialized graph"
    );
    serialized
}

fn encode_graph(network: &Network, id: GraphId, inside: &HashSet<NodeId>) -> SerializedGraph {
    let graph = network.graph(id);
    let nodes = graph
        .members()
        .iter()
        .map(|member| match *member {
            Member::Node(node) => SerializedMember::Node(encode_node(network, node, inside)),
            Member::Graph(child) => SerializedMember::Graph(encode_graph(network, child, inside)),
        })
        .collect();

    let alias = |plug: &PlugId| {
        let plug = network.plug(*plug);
        SerializedAlias {
            plug: plug.name().to_string(),
            node_identifier: network.node(plug.owner()).identifier().to_string(),
        }
    };

    SerializedGraph {
        identifier: graph.identifier().to_string(),
        name: graph.name().to_string(),
        nodes,
        inputs: graph
            .inputs()
            .iter()
            .map(|(name, plug)| (name.clone(), alias(plug)))
            .collect(),
        outputs: graph
            .outputs()
            .iter()
            .map(|(name, plug)| (name.clone(), alias(plug)))
            .collect(),
    }
}

fn encode_node(network: &Network, id: NodeId, inside: &HashSet<NodeId>) -> SerializedNode {
    let node = network.node(id);
    let encode_plugs = |plugs: &IndexMap<String, PlugId>| {
        plugs
            .iter()
            .map(|(name, plug)| {
                let plug = network.plug(*plug);
                let connections = plug
                    .connections()
                    .iter()
                    .map(|other| network.plug(*other))
                    .filter(|other| inside.contains(&other.owner()))
                    .map(|other| PlugRef {
                        name: other.name().to_string(),
                        node_identifier: network.node(other.owner()).identifier().to_string(),
                    })
                    .collect();
                (
                    name.clone(),
                    SerializedPlug {
                        value: plug.value().clone(),
                        connections,
                    },
                )
            })
            .collect::<IndexMap<_, _>>()
    };

    SerializedNode {
        identifier: node.identifier().to_string(),
        name: node.name().to_string(),
        doc: node.doc().map(str::to_string),
        node_type: node.kind().tag().to_string(),
        inputs: encode_plugs(node.inputs()),
        outputs: encode_plugs(node.outputs()),
        attributes: node.attributes().clone(),
    }
}

// ----------------------------------------------------------------------------
// Decoding
// ----------------------------------------------------------------------------

/// Rebuild a graph into a fresh network.
pub fn deserialize(data: &SerializedGraph, registry: &NodeRegistry) -> Result<(Network, GraphId)> {
    let mut network = Network::new();
    let graph = deserialize_into(&mut network, data, registry)?;
    Ok((network, graph))
}

/// Rebuild a graph inside an existing network.
///
/// Reconstruction is staged on a copy of the network; on failure `network`
/// is left exactly as it was.
pub fn deserialize_into(
    network: &mut Network,
    data: &SerializedGraph,
    registry: &NodeRegistry,
) -> Result<GraphId> {
    let mut staged = network.clone();
    let mut decoder = Decoder {
        network: &mut staged,
        registry,
        nodes: HashMap::new(),
    };

    let graph = decoder.graph(data)?;
    decoder.connect(data)?;

    tracing::debug!(
        graph = %data.name,
        nodes = decoder.nodes.len(),
        "deserialized graph"
    );
    *network = staged;
    Ok(graph)
}

struct Decoder<'a> {
    network: &'a mut Network,
    registry: &'a NodeRegistry,

    /// Identifier -> rebuilt node.
    nodes: HashMap<String, NodeId>,
}

impl Decoder<'_> {
    /// Create the graph, its members and aliases. No connections yet.
    fn graph(&mut self, data: &SerializedGraph) -> Result<GraphId> {
        let graph = self
            .network
            .create_graph_with_identifier(data.identifier.clone(), data.name.clone())?;

        for member in &data.nodes {
            match member {
                SerializedMember::Node(node) => {
                    let id = self.node(node)?;
                    self.network.add_member(graph, id)?;
                }
                SerializedMember::Graph(child) => {
                    let id = self.graph(child)?;
                    self.network.add_member(graph, id)?;
                }
            }
        }

        for (name, alias) in &data.inputs {
            let plug = self.known_plug(&alias.node_identifier, Direction::Input, &alias.plug)?;
            self.network.expose_input(graph, name.clone(), plug)?;
        }
        for (name, alias) in &data.outputs {
            let plug = self.known_plug(&alias.node_identifier, Direction::Output, &alias.plug)?;
            self.network.expose_output(graph, name.clone(), plug)?;
        }
        Ok(graph)
    }

    fn node(&mut self, data: &SerializedNode) -> Result<NodeId> {
        let kind = self.registry.get(&data.node_type).ok_or_else(|| {
            SerializationError::UnknownNodeType {
                tag: data.node_type.clone(),
                node: data.identifier.clone(),
            }
        })?;

        let unknown = |direction, name: &String| SerializationError::UnknownPlug {
            node: data.identifier.clone(),
            direction,
            name: name.clone(),
        };
        if let Some(name) = data.inputs.keys().find(|name| !kind.inputs().contains_key(*name)) {
            return Err(unknown(Direction::Input, name).into());
        }
        if let Some(name) = data.outputs.keys().find(|name| !kind.outputs().contains(*name)) {
            return Err(unknown(Direction::Output, name).into());
        }

        let mut spec = kind
            .spawn()
            .with_name(data.name.clone())
            .with_identifier(data.identifier.clone());
        for (name, plug) in &data.inputs {
            spec = spec.with_input(name.clone(), plug.value.clone());
        }
        for (key, value) in &data.attributes {
            spec = spec.with_attribute(key.clone(), value.clone());
        }

        let id = self.network.add_node(spec)?;
        self.network.nodes[id.index()].set_doc(data.doc.clone());
        for (name, plug) in &data.outputs {
            let output = self.network.nodes[id.index()].outputs()[name];
            self.network.plugs[output.index()].commit(plug.value.clone());
        }

        self.nodes.insert(data.identifier.clone(), id);
        Ok(id)
    }

    /// Resolve a plug on a node rebuilt earlier.
    fn plug(&self, identifier: &str, direction: Direction, name: &str) -> Option<PlugId> {
        let node = *self.nodes.get(identifier)?;
        let host = self.network.host(node);
        host.plug(direction, name)
    }

    fn known_plug(&self, identifier: &str, direction: Direction, name: &str) -> Result<PlugId> {
        self.plug(identifier, direction, name).ok_or_else(|| {
            SerializationError::UnknownPlug {
                node: identifier.to_string(),
                direction,
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Re-establish connections from the output side, then check that the
    /// input side agrees.
    fn connect(&mut self, data: &SerializedGraph) -> Result<()> {
        let mut nodes = Vec::new();
        data.visit_nodes(&mut |node| nodes.push(node));

        for node in &nodes {
            for (name, plug) in &node.outputs {
                let from = self.known_plug(&node.identifier, Direction::Output, name)?;
                for target in &plug.connections {
                    let to = self
                        .plug(&target.node_identifier, Direction::Input, &target.name)
                        .ok_or_else(|| unresolved(node, name, target))?;
                    self.network.connect(from, to)?;
                }
            }
        }

        for node in &nodes {
            for (name, plug) in &node.inputs {
                let to = self.known_plug(&node.identifier, Direction::Input, name)?;
                for source in &plug.connections {
                    let expected = self
                        .plug(&source.node_identifier, Direction::Output, &source.name)
                        .ok_or_else(|| unresolved(node, name, source))?;
                    if self.network.upstream(to) != Some(expected) {
                        return Err(unresolved(node, name, source));
                    }
                }
            }
        }
        Ok(())
    }
}

fn unresolved(node: &SerializedNode, plug: &str, target: &PlugRef) -> GraphError {
    SerializationError::UnresolvedConnection {
        plug: format!("{}.{}", node.name, plug),
        target: target.node_identifier.clone(),
        target_plug: target.name.clone(),
    }
    .into()
}
