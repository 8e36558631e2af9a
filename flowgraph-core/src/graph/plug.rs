//! Plugs
//!
//! A plug is a named terminal on a node. It stores the current value, a dirty
//! flag and the handles of the plugs it is connected to. Plugs live in the
//! [`Network`](super::Network) arena; connections are `PlugId` pairs stored
//! on both ends.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::node::{NodeId, Value};

/// Handle to a plug inside a [`Network`](super::Network).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlugId(u32);

impl PlugId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of the plug in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which side of a node a plug sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Receives a value, from upstream or by assignment.
    Input,
    /// Produced by the owning node's compute step.
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// A named data terminal owned by exactly one node.
#[derive(Debug, Clone)]
pub struct Plug {
    /// Name, unique among the owner's plugs of the same direction.
    name: String,

    /// The owning node (back-reference by handle).
    owner: NodeId,

    direction: Direction,

    /// Current value.
    value: Value,

    /// Whether the value may be stale relative to what the owner last saw.
    dirty: bool,

    /// Connected plugs. At most one entry for an input.
    connections: SmallVec<[PlugId; 2]>,
}

impl Plug {
    /// Create a plug. New plugs start dirty so their owner runs at least once.
    pub(crate) fn new(name: String, owner: NodeId, direction: Direction, value: Value) -> Self {
        Self {
            name,
            owner,
            direction,
            value,
            dirty: true,
            connections: SmallVec::new(),
        }
    }

    /// The plug's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node owning this plug.
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Input or output.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether the plug is dirty.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Connected plugs, in connection order.
    pub fn connections(&self) -> &[PlugId] {
        &self.connections
    }

    /// Whether any connection exists.
    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    /// The single upstream plug of an input, if connected.
    pub fn upstream(&self) -> Option<PlugId> {
        match self.direction {
            Direction::Input => self.connections.first().copied(),
            Direction::Output => None,
        }
    }

    /// Store `value`, marking the plug dirty unless it equals the old value.
    ///
    /// Returns whether the value changed.
    pub(crate) fn assign(&mut self, value: Value) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        self.dirty = true;
        true
    }

    /// Store `value` as a freshly computed, clean value.
    pub(crate) fn commit(&mut self, value: Value) {
        self.value = value;
        self.dirty = false;
    }

    pub(crate) fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub(crate) fn add_connection(&mut self, other: PlugId) {
        if !self.connections.contains(&other) {
            self.connections.push(other);
        }
    }

    /// Returns whether the connection existed.
    pub(crate) fn remove_connection(&mut self, other: PlugId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|p| *p != other);
        self.connections.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plug(direction: Direction) -> Plug {
        Plug::new("in1".into(), NodeId::from_index(0), direction, json!(0))
    }

    #[test]
    fn new_plug_starts_dirty() {
        let p = plug(Direction::Input);
        assert!(p.is_dirty());
        assert!(!p.is_connected());
        assert_eq!(p.value(), &json!(0));
    }

    #[test]
    fn assign_identical_value_keeps_clean() {
        let mut p = plug(Direction::Input);
        p.set_dirty(false);

        assert!(!p.assign(json!(0)));
        assert!(!p.is_dirty());

        assert!(p.assign(json!(5)));
        assert!(p.is_dirty());
        assert_eq!(p.value(), &json!(5));
    }

    #[test]
    fn commit_clears_dirty() {
        let mut p = plug(Direction::Output);
        p.commit(json!("x"));
        assert!(!p.is_dirty());
        assert_eq!(p.value(), &json!("x"));
    }

    #[test]
    fn connections_are_deduplicated() {
        let mut p = plug(Direction::Output);
        let a = PlugId::from_index(3);
        let b = PlugId::from_index(4);

        p.add_connection(a);
        p.add_connection(b);
        p.add_connection(a);
        assert_eq!(p.connections(), &[a, b]);
        assert_eq!(p.upstream(), None);

        assert!(p.remove_connection(a));
        assert!(!p.remove_connection(a));
        assert_eq!(p.connections(), &[b]);
    }

    #[test]
    fn input_upstream_is_first_connection() {
        let mut p = plug(Direction::Input);
        let a = PlugId::from_index(7);
        p.add_connection(a);
        assert_eq!(p.upstream(), Some(a));
    }
}
