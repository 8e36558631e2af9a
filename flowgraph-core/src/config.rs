//! Network Configuration
//!
//! Behaviour switches for a [`Network`](crate::Network). The configuration is
//! plain data so it can be embedded in a larger application config and
//! loaded from JSON.

use serde::{Deserialize, Serialize};

/// What `connect` does when the target input already has an upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectPolicy {
    /// Refuse the new connection with `ConnectionError::AlreadyConnected`.
    #[default]
    Reject,
    /// Drop the previous upstream edge and accept the new one.
    Replace,
}

/// Configuration for a [`Network`](crate::Network).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Handling of a second upstream source for one input.
    pub connect_policy: ConnectPolicy,

    /// Minimum layer width before the layered driver evaluates a layer on
    /// the thread pool. Narrower layers run inline.
    pub parallel_threshold: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_policy: ConnectPolicy::Reject,
            parallel_threshold: 2,
        }
    }
}

impl NetworkConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
