//! Flowgraph Core
//!
//! This crate provides a dataflow graph engine. Computations are graphs of
//! nodes linked through named plugs; values flow along connections from
//! output plugs to input plugs.
//!
//! It implements:
//!
//! - Nodes, plugs and nested graphs with boundary plugs
//! - Dirty tracking with one-hop invalidation
//! - Dependency-ordered evaluation, flat or layered
//! - Serialization that preserves identity and reconnects by identifier
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: the data model and the ordering algorithms
//! - `factory`: turning plain functions into node types
//! - `codec`: serialization and the node type registry
//! - `engine`: drivers that evaluate a whole graph
//! - `pretty`: text dumps for diagnostics
//!
//! # Example
//!
//! ```rust
//! use flowgraph_core::{Engine, Network, NodeType, PlugValues};
//! use serde_json::json;
//!
//! let multiply = NodeType::new("multiply", |ctx| {
//!     let a = ctx.input("a")?.as_i64().unwrap_or(0);
//!     let b = ctx.input("b")?.as_i64().unwrap_or(0);
//!     Ok(PlugValues::from([("out".to_string(), json!(a * b))]))
//! })
//! .with_input("a", json!(1))
//! .with_input("b", json!(1))
//! .with_output("out")
//! .build();
//!
//! let mut net = Network::new();
//! let graph = net.create_graph("example");
//! let first = net.add_node(multiply.spawn().with_input("a", json!(3)).with_input("b", json!(2)))?;
//! let second = net.add_node(multiply.spawn())?;
//! net.add_members(graph, [first, second])?;
//! net.connect(net.output(first, "out")?, net.input(second, "a")?)?;
//!
//! Engine::evaluate_all(&mut net, graph)?;
//! assert_eq!(net.output_values(second)["out"], json!(6));
//! assert!(!net.is_dirty(graph));
//! # Ok::<(), flowgraph_core::GraphError>(())
//! ```

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod factory;
pub mod graph;
pub mod pretty;

pub use codec::{deserialize, deserialize_into, serialize, NodeRegistry, SerializedGraph};
pub use config::{ConnectPolicy, NetworkConfig};
pub use engine::Engine;
pub use error::{ComputeError, ConnectionError, ErrorKind, GraphError, Result, SerializationError};
pub use factory::FunctionNode;
pub use graph::{
    Compute, ComputeContext, Direction, EvaluationPlan, GraphId, Member, Network, NodeId, NodeType,
    PlugId, PlugValues, Value,
};
