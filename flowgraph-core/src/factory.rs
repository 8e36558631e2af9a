//! Function Nodes
//!
//! Turns an ordinary function into a [`NodeType`]. The function's parameters
//! become input plugs, the declared output names become output plugs, and
//! the function name doubles as the default node name and registry tag.
//!
//! ```rust
//! use flowgraph_core::factory::FunctionNode;
//! use flowgraph_core::graph::{Network, PlugValues};
//! use serde_json::json;
//!
//! let add = FunctionNode::new("add", |inputs| {
//!     let a = inputs["a"].as_i64().unwrap_or(0);
//!     let b = inputs["b"].as_i64().unwrap_or(0);
//!     Ok(PlugValues::from([("sum".to_string(), json!(a + b))]))
//! })
//! .param("a")
//! .param_with_default("b", json!(1))
//! .outputs(["sum"])
//! .build();
//!
//! let mut net = Network::new();
//! let node = net.add_node(add.spawn().with_input("a", json!(2))).unwrap();
//! assert_eq!(net.evaluate(node).unwrap()["sum"], json!(3));
//! ```

use std::sync::Arc;

use indexmap::IndexMap;

use crate::codec::NodeRegistry;
use crate::error::ComputeError;
use crate::graph::{Compute, ComputeContext, NodeType, PlugValues, Value};

/// Parameter name that binds the node itself instead of declaring a plug.
const SELF_PARAM: &str = "self";

type PlainFn = dyn Fn(&PlugValues) -> Result<PlugValues, ComputeError> + Send + Sync;
type MethodFn = dyn Fn(&ComputeContext<'_>) -> Result<PlugValues, ComputeError> + Send + Sync;

#[derive(Clone)]
enum Body {
    /// Sees the input values only.
    Plain(Arc<PlainFn>),
    /// Also sees the node (name, identifier, attributes).
    Method(Arc<MethodFn>),
}

impl Compute for Body {
    fn compute(&self, ctx: &ComputeContext<'_>) -> Result<PlugValues, ComputeError> {
        match self {
            Body::Plain(f) => f(ctx.inputs()),
            Body::Method(f) => f(ctx),
        }
    }
}

/// Builder for a function-backed node type.
#[derive(Clone)]
pub struct FunctionNode {
    name: String,
    tag: Option<String>,
    doc: Option<String>,
    params: IndexMap<String, Value>,
    outputs: Vec<String>,
    self_bound: bool,
    body: Body,
}

impl FunctionNode {
    /// Wrap a function of the input values.
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&PlugValues) -> Result<PlugValues, ComputeError> + Send + Sync + 'static,
    {
        Self::with_body(name.into(), Body::Plain(Arc::new(f)), false)
    }

    /// Wrap a function that also receives the node it runs on.
    pub fn method<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ComputeContext<'_>) -> Result<PlugValues, ComputeError> + Send + Sync + 'static,
    {
        Self::with_body(name.into(), Body::Method(Arc::new(f)), true)
    }

    fn with_body(name: String, body: Body, self_bound: bool) -> Self {
        Self {
            name,
            tag: None,
            doc: None,
            params: IndexMap::new(),
            outputs: Vec::new(),
            self_bound,
            body,
        }
    }

    /// Declare a parameter without a default (the plug starts as `null`).
    ///
    /// A leading `self` is not a plug: it marks the function as bound to
    /// its node.
    pub fn param(self, name: impl Into<String>) -> Self {
        self.param_with_default(name, Value::Null)
    }

    /// Declare a parameter with a default value.
    pub fn param_with_default(mut self, name: impl Into<String>, default: Value) -> Self {
        let name = name.into();
        if name == SELF_PARAM && self.params.is_empty() {
            self.self_bound = true;
            return self;
        }
        self.params.insert(name, default);
        self
    }

    /// Declare the output names.
    pub fn outputs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs.extend(names.into_iter().map(Into::into));
        self
    }

    /// Register under a tag other than the function name.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Documentation copied onto every node.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Whether the function takes its node as first argument.
    pub fn is_self_bound(&self) -> bool {
        self.self_bound
    }

    pub fn build(self) -> Arc<NodeType> {
        let tag = self.tag.unwrap_or_else(|| self.name.clone());
        let mut kind = NodeType::from_compute(tag, self.body).with_name(self.name);
        if let Some(doc) = self.doc {
            kind = kind.with_doc(doc);
        }
        for (name, default) in self.params {
            kind = kind.with_input(name, default);
        }
        for name in self.outputs {
            kind = kind.with_output(name);
        }
        kind.build()
    }

    /// Build and register with `registry` so the codec can find it again.
    pub fn register(self, registry: &NodeRegistry) -> Arc<NodeType> {
        let kind = self.build();
        registry.register(Arc::clone(&kind));
        kind
    }
}
