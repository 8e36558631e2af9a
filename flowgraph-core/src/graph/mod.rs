//! Dataflow Graph
//!
//! This module implements the node/plug/graph data model and the algorithms
//! that run over it.
//!
//! # Overview
//!
//! The dataflow graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes are units of computation with named input and output plugs
//! - Edges are connections from an output plug to an input plug
//! - Graphs group nodes (and other graphs) and can stand in for a node
//!
//! Setting a value marks the next hop dirty. The scheduler orders the
//! nodes of a graph so that a driver can re-evaluate only the stale ones.
//!
//! # Design Decisions
//!
//! 1. Every node, plug and graph lives in one [`Network`] arena and is
//!    addressed by a copyable handle. Connections are handle pairs, so
//!    back-references and cross-graph wiring never form ownership cycles.
//!
//! 2. Handles are dense indices for O(1) lookups.
//!
//! 3. Connections are recorded on both ends (output to inputs, input to
//!    its upstream) to walk the topology in either direction.

mod evaluate;
mod expand;
mod network;
mod node;
mod plug;
mod scheduler;
mod subgraph;
mod wiring;

pub use expand::Connection;
pub use network::Network;
pub use node::{Compute, ComputeContext, Node, NodeId, NodeSpec, NodeType, PlugValues, Value};
pub use plug::{Direction, Plug, PlugId};
pub use scheduler::EvaluationPlan;
pub use subgraph::{Graph, GraphId, Member, PlugHost};
