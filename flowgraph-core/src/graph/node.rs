//! Graph Nodes
//!
//! This module defines node types, the compute seam, and the node records
//! that live in the [`Network`](super::Network) arena.
//!
//! # Types and Instances
//!
//! A [`NodeType`] describes a kind of computation: its declared input plugs
//! (with defaults), its declared output plugs, documentation, and the
//! [`Compute`] step. [`NodeType::spawn`] produces a [`NodeSpec`], a pending
//! instance with a fresh identifier that can be renamed or pre-filled before
//! [`Network::add_node`](super::Network::add_node) materialises it.
//!
//! Every spawn produces an independent node. Nothing is shared between
//! instances except the immutable type description.

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use uuid::Uuid;

use super::plug::PlugId;
use super::subgraph::GraphId;
use crate::error::ComputeError;

/// The payload carried by plugs.
pub type Value = serde_json::Value;

/// Plug values keyed by plug name, in declaration order.
pub type PlugValues = IndexMap<String, Value>;

/// Generate a fresh node or graph identifier.
pub(crate) fn new_identifier() -> String {
    Uuid::new_v4().to_string()
}

/// Handle to a node inside a [`Network`](super::Network).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node's compute step: a pure function of its current input values.
///
/// Implementations must not assume anything about evaluation order beyond
/// "all upstream nodes ran first". They may read the node's attributes
/// through the context but cannot reach the topology.
pub trait Compute: Send + Sync {
    /// Produce a value for every declared output.
    fn compute(&self, ctx: &ComputeContext<'_>) -> Result<PlugValues, ComputeError>;
}

impl<F> Compute for F
where
    F: Fn(&ComputeContext<'_>) -> Result<PlugValues, ComputeError> + Send + Sync,
{
    fn compute(&self, ctx: &ComputeContext<'_>) -> Result<PlugValues, ComputeError> {
        self(ctx)
    }
}

/// What a compute step can see while running.
pub struct ComputeContext<'a> {
    node: &'a Node,
    inputs: &'a PlugValues,
}

impl<'a> ComputeContext<'a> {
    pub(crate) fn new(node: &'a Node, inputs: &'a PlugValues) -> Self {
        Self { node, inputs }
    }

    /// All resolved input values.
    pub fn inputs(&self) -> &'a PlugValues {
        self.inputs
    }

    /// One input value.
    pub fn input(&self, name: &str) -> Result<&'a Value, ComputeError> {
        self.inputs
            .get(name)
            .ok_or_else(|| ComputeError::MissingInput(name.to_string()))
    }

    /// Name of the node being evaluated.
    pub fn name(&self) -> &'a str {
        self.node.name()
    }

    /// Identifier of the node being evaluated.
    pub fn identifier(&self) -> &'a str {
        self.node.identifier()
    }

    /// An auxiliary attribute stored on the node.
    pub fn attribute(&self, key: &str) -> Option<&'a Value> {
        self.node.attribute(key)
    }
}

/// Description of a kind of node.
pub struct NodeType {
    /// Registry key used by the codec.
    tag: String,

    /// Name given to instances that are not renamed.
    default_name: String,

    doc: Option<String>,

    /// Declared inputs with their default values.
    inputs: IndexMap<String, Value>,

    /// Declared output names.
    outputs: IndexSet<String>,

    compute: Arc<dyn Compute>,
}

impl NodeType {
    /// Create a node type from a compute closure. The tag doubles as the
    /// default name.
    pub fn new<F>(tag: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&ComputeContext<'_>) -> Result<PlugValues, ComputeError> + Send + Sync + 'static,
    {
        Self::from_compute(tag, compute)
    }

    /// Create a node type from any [`Compute`] implementation.
    pub fn from_compute<C>(tag: impl Into<String>, compute: C) -> Self
    where
        C: Compute + 'static,
    {
        let tag = tag.into();
        Self {
            default_name: tag.clone(),
            tag,
            doc: None,
            inputs: IndexMap::new(),
            outputs: IndexSet::new(),
            compute: Arc::new(compute),
        }
    }

    /// Set the default instance name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    /// Set the documentation copied to every instance.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Declare an input plug. Redeclaring a name replaces its default.
    pub fn with_input(mut self, name: impl Into<String>, default: Value) -> Self {
        self.inputs.insert(name.into(), default);
        self
    }

    /// Declare an output plug.
    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.insert(name.into());
        self
    }

    /// Finish the description.
    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Registry key.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Name given to instances by default.
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Documentation text.
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Declared inputs and their defaults.
    pub fn inputs(&self) -> &IndexMap<String, Value> {
        &self.inputs
    }

    /// Declared outputs.
    pub fn outputs(&self) -> &IndexSet<String> {
        &self.outputs
    }

    /// Start a new instance with a fresh identifier.
    pub fn spawn(self: &Arc<Self>) -> NodeSpec {
        NodeSpec {
            kind: Arc::clone(self),
            name: self.default_name.clone(),
            identifier: new_identifier(),
            values: IndexMap::new(),
            attributes: IndexMap::new(),
        }
    }

    pub(crate) fn run(&self, ctx: &ComputeContext<'_>) -> Result<PlugValues, ComputeError> {
        self.compute.compute(ctx)
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeType")
            .field("tag", &self.tag)
            .field("default_name", &self.default_name)
            .field("inputs", &self.inputs.keys().collect::<Vec<_>>())
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// A node instance that has not been added to a network yet.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    kind: Arc<NodeType>,
    name: String,
    identifier: String,

    /// Input values that override the type defaults.
    values: IndexMap<String, Value>,

    attributes: IndexMap<String, Value>,
}

impl NodeSpec {
    /// Override the instance name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the generated identifier.
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Pre-assign an input value.
    pub fn with_input(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Attach an auxiliary attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// The instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The instance identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The node type.
    pub fn kind(&self) -> &Arc<NodeType> {
        &self.kind
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Arc<NodeType>,
        String,
        String,
        IndexMap<String, Value>,
        IndexMap<String, Value>,
    ) {
        (
            self.kind,
            self.name,
            self.identifier,
            self.values,
            self.attributes,
        )
    }
}

/// A node stored in the network.
#[derive(Debug, Clone)]
pub struct Node {
    /// Globally unique, stable across serialization.
    identifier: String,

    /// Human label. Not unique.
    name: String,

    doc: Option<String>,

    kind: Arc<NodeType>,

    /// Input plugs by name, in declaration order.
    inputs: IndexMap<String, PlugId>,

    /// Output plugs by name, in declaration order.
    outputs: IndexMap<String, PlugId>,

    /// Auxiliary state readable by the compute step.
    attributes: IndexMap<String, Value>,

    /// The graph this node belongs to.
    graph: Option<GraphId>,
}

impl Node {
    pub(crate) fn new(
        identifier: String,
        name: String,
        kind: Arc<NodeType>,
        attributes: IndexMap<String, Value>,
    ) -> Self {
        Self {
            identifier,
            name,
            doc: kind.doc().map(str::to_string),
            kind,
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            attributes,
            graph: None,
        }
    }

    /// The node's identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The node's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Documentation text.
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// The node type.
    pub fn kind(&self) -> &Arc<NodeType> {
        &self.kind
    }

    /// Input plugs by name.
    pub fn inputs(&self) -> &IndexMap<String, PlugId> {
        &self.inputs
    }

    /// Output plugs by name.
    pub fn outputs(&self) -> &IndexMap<String, PlugId> {
        &self.outputs
    }

    /// One auxiliary attribute.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// All auxiliary attributes.
    pub fn attributes(&self) -> &IndexMap<String, Value> {
        &self.attributes
    }

    /// The owning graph, if any.
    pub fn graph(&self) -> Option<GraphId> {
        self.graph
    }

    pub(crate) fn add_input(&mut self, name: String, plug: PlugId) {
        self.inputs.insert(name, plug);
    }

    pub(crate) fn add_output(&mut self, name: String, plug: PlugId) {
        self.outputs.insert(name, plug);
    }

    pub(crate) fn set_doc(&mut self, doc: Option<String>) {
        self.doc = doc;
    }

    pub(crate) fn set_attribute(&mut self, key: String, value: Value) {
        self.attributes.insert(key, value);
    }

    pub(crate) fn set_graph(&mut self, graph: Option<GraphId>) {
        self.graph = graph;
    }
}
