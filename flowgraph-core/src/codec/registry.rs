//! Node Type Registry
//!
//! Deserialization rebuilds nodes from the type tag recorded for each one.
//! The registry maps those tags to [`NodeType`]s. Types must be registered
//! before a graph using them is decoded; unknown tags are an error.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::graph::NodeType;

/// Process-wide registry behind [`NodeRegistry::global`].
static GLOBAL: OnceLock<NodeRegistry> = OnceLock::new();

/// Tag to node type lookup table.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    types: DashMap<String, Arc<NodeType>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared registry, created on first use.
    pub fn global() -> &'static NodeRegistry {
        GLOBAL.get_or_init(NodeRegistry::new)
    }

    /// Register a type under its tag, returning the type it replaced.
    pub fn register(&self, kind: Arc<NodeType>) -> Option<Arc<NodeType>> {
        let tag = kind.tag().to_string();
        let previous = self.types.insert(tag.clone(), kind);
        if previous.is_some() {
            tracing::debug!(%tag, "replaced registered node type");
        } else {
            tracing::trace!(%tag, "registered node type");
        }
        previous
    }

    /// Look up a type by tag.
    pub fn get(&self, tag: &str) -> Option<Arc<NodeType>> {
        self.types.get(tag).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.types.contains_key(tag)
    }

    /// Remove a type, returning it if it was registered.
    pub fn unregister(&self, tag: &str) -> Option<Arc<NodeType>> {
        self.types.remove(tag).map(|(_, kind)| kind)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.types.iter().map(|entry| entry.key().clone()).collect();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
