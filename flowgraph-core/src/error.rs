//! Error types for the dataflow engine.
//!
//! Every failure the engine can report is a [`GraphError`]. The variants are
//! grouped by the taxonomy callers branch on (see [`ErrorKind`]):
//!
//! - structural problems with the topology (cycles, bad membership)
//! - failed lookups by name, identifier or plug name
//! - compute steps that fail or omit a declared output
//! - invalid wiring
//! - serialized structures that cannot be reconstructed
//!
//! None of these are fatal. The engine never commits partial state before
//! returning one of them.

use thiserror::Error;

use crate::graph::Direction;

/// Convenience alias used throughout the crate.
pub type Result<T, E = GraphError> = std::result::Result<T, E>;

/// Coarse classification of a [`GraphError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The topology is invalid for the requested operation.
    Structural,
    /// A node, identifier or plug was not found.
    Lookup,
    /// A compute step failed.
    Compute,
    /// Plugs could not be (dis)connected or assigned.
    Connection,
    /// A serialized structure could not be encoded or reconstructed.
    Serialization,
}

/// The main error type for graph operations.
#[derive(Error, Debug)]
pub enum GraphError {
    // =========================================================================
    // Structural
    // =========================================================================
    /// Ordering encountered a connection cycle.
    #[error("connection cycle among nodes: {}", .nodes.join(", "))]
    Cycle {
        /// Names of the nodes that could not be placed.
        nodes: Vec<String>,
    },

    /// A graph would end up nested inside itself.
    #[error("graph `{graph}` cannot be nested inside `{parent}`")]
    NestingCycle {
        /// The graph being added.
        graph: String,
        /// The graph it was being added to.
        parent: String,
    },

    /// The member already belongs to a graph.
    #[error("`{member}` already belongs to graph `{graph}`")]
    AlreadyMember {
        /// The member being added.
        member: String,
        /// Its current owning graph.
        graph: String,
    },

    /// The identifier is already used by another node or graph.
    #[error("identifier `{0}` is already in use")]
    DuplicateIdentifier(String),

    /// A boundary alias cannot be bound to the given plug.
    #[error("cannot expose `{plug}` as {direction} `{name}` of graph `{graph}`: {reason}")]
    InvalidAlias {
        /// The graph receiving the alias.
        graph: String,
        /// The boundary name.
        name: String,
        /// The boundary direction.
        direction: Direction,
        /// The interior plug, as `node.plug`.
        plug: String,
        /// Why the binding was refused.
        reason: &'static str,
    },

    // =========================================================================
    // Lookup
    // =========================================================================
    /// No node with the given name exists in the graph.
    #[error("no node named `{name}` in graph `{graph}`")]
    NodeNotFound {
        /// The graph that was searched.
        graph: String,
        /// The requested name.
        name: String,
    },

    /// No node with the given identifier exists in the graph.
    #[error("no node with identifier `{identifier}` in graph `{graph}`")]
    IdentifierNotFound {
        /// The graph that was searched.
        graph: String,
        /// The requested identifier.
        identifier: String,
    },

    /// A node or graph has no plug with the given name.
    #[error("`{owner}` has no {direction} plug named `{name}`")]
    PlugNotFound {
        /// Name of the node or graph.
        owner: String,
        /// Which side was searched.
        direction: Direction,
        /// The requested plug name.
        name: String,
    },

    // =========================================================================
    // Compute
    // =========================================================================
    /// The compute step of a node returned an error.
    #[error("node `{node}` failed to compute: {source}")]
    Compute {
        /// Name of the failing node.
        node: String,
        /// The error returned by the compute step.
        #[source]
        source: ComputeError,
    },

    /// The compute step did not produce one of the declared outputs.
    #[error("node `{node}` did not produce declared output `{output}`")]
    MissingOutput {
        /// Name of the node.
        node: String,
        /// The missing output name.
        output: String,
    },

    // =========================================================================
    // Connection / Serialization
    // =========================================================================
    /// Wiring failed.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Encoding or reconstruction failed.
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl GraphError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Cycle { .. }
            | Self::NestingCycle { .. }
            | Self::AlreadyMember { .. }
            | Self::DuplicateIdentifier(_)
            | Self::InvalidAlias { .. } => ErrorKind::Structural,
            Self::NodeNotFound { .. }
            | Self::IdentifierNotFound { .. }
            | Self::PlugNotFound { .. } => ErrorKind::Lookup,
            Self::Compute { .. } | Self::MissingOutput { .. } => ErrorKind::Compute,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

/// Errors raised while wiring plugs or assigning their values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Connections must run from an output plug to an input plug.
    #[error("cannot connect {from} ({from_direction}) to {to} ({to_direction})")]
    Direction {
        /// Source plug, as `node.plug`.
        from: String,
        /// Direction of the source plug.
        from_direction: Direction,
        /// Target plug, as `node.plug`.
        to: String,
        /// Direction of the target plug.
        to_direction: Direction,
    },

    /// The input already has an upstream source.
    #[error("input {input} is already connected to {upstream}")]
    AlreadyConnected {
        /// The input plug, as `node.plug`.
        input: String,
        /// Its current upstream plug.
        upstream: String,
    },

    /// The two plugs are not connected.
    #[error("{from} is not connected to {to}")]
    NotConnected {
        /// Source plug, as `node.plug`.
        from: String,
        /// Target plug, as `node.plug`.
        to: String,
    },

    /// Connected inputs receive their value from upstream only.
    #[error("input {input} is driven by {upstream} and cannot be assigned directly")]
    ConnectedInput {
        /// The input plug, as `node.plug`.
        input: String,
        /// Its upstream plug.
        upstream: String,
    },
}

/// Errors returned by a node's compute step.
#[derive(Error, Debug)]
pub enum ComputeError {
    /// The compute step expected an input that was not supplied.
    #[error("missing input `{0}`")]
    MissingInput(String),

    /// An input held a value the compute step cannot use.
    #[error("input `{name}` is invalid: {reason}")]
    InvalidInput {
        /// The input name.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Free-form failure.
    #[error("{0}")]
    Failed(String),

    /// Any other error raised by user code.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ComputeError {
    /// Build a free-form failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Build an invalid-input failure.
    pub fn invalid_input(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while encoding or reconstructing a graph.
#[derive(Error, Debug)]
pub enum SerializationError {
    /// No node type is registered under the recorded tag.
    #[error("node type `{tag}` (node `{node}`) is not registered")]
    UnknownNodeType {
        /// The recorded type tag.
        tag: String,
        /// Identifier of the node that used it.
        node: String,
    },

    /// A recorded connection points at a node that is not part of the structure.
    #[error("connection {plug} -> `{target_plug}` on node `{target}` cannot be resolved")]
    UnresolvedConnection {
        /// The plug that recorded the connection, as `node.plug`.
        plug: String,
        /// Identifier of the node it points at.
        target: String,
        /// Plug name on that node.
        target_plug: String,
    },

    /// A recorded plug does not exist on the reconstructed node.
    #[error("node `{node}` has no {direction} plug `{name}`")]
    UnknownPlug {
        /// Identifier of the node.
        node: String,
        /// Which side was searched.
        direction: Direction,
        /// The recorded plug name.
        name: String,
    },

    /// JSON encoding or decoding failed.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// MessagePack encoding failed.
    #[error("msgpack encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// MessagePack decoding failed.
    #[error("msgpack decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
