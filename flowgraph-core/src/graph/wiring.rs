//! Wiring and Value Assignment
//!
//! Connections run from an output plug to an input plug. An output may feed
//! many inputs; an input has at most one upstream source.
//!
//! # One-hop Invalidation
//!
//! Connecting or assigning marks only the directly affected input plugs
//! dirty. Nothing walks further downstream here: the next hop is dirtied when
//! the owning node is evaluated and pushes a changed output (see
//! `evaluate.rs`).

use super::network::Network;
use super::node::Value;
use super::plug::{Direction, PlugId};
use crate::config::ConnectPolicy;
use crate::error::{ConnectionError, Result};

impl Network {
    /// Connect an output plug to an input plug.
    ///
    /// If the input already has a different upstream source, the configured
    /// [`ConnectPolicy`] decides between rejecting and replacing it.
    /// Connecting the same pair twice is a no-op.
    pub fn connect(&mut self, from: PlugId, to: PlugId) -> Result<()> {
        let replace = self.config().connect_policy == ConnectPolicy::Replace;
        self.link(from, to, replace)
    }

    /// Connect, dropping any previous upstream source of `to`.
    pub fn connect_replacing(&mut self, from: PlugId, to: PlugId) -> Result<()> {
        self.link(from, to, true)
    }

    fn link(&mut self, from: PlugId, to: PlugId, replace: bool) -> Result<()> {
        let source = &self.plugs[from.index()];
        let target = &self.plugs[to.index()];

        if source.direction() != Direction::Output || target.direction() != Direction::Input {
            return Err(ConnectionError::Direction {
                from: self.describe_plug(from),
                from_direction: source.direction(),
                to: self.describe_plug(to),
                to_direction: target.direction(),
            }
            .into());
        }

        if let Some(previous) = target.upstream() {
            if previous == from {
                return Ok(());
            }
            if !replace {
                return Err(ConnectionError::AlreadyConnected {
                    input: self.describe_plug(to),
                    upstream: self.describe_plug(previous),
                }
                .into());
            }
            tracing::trace!(
                input = %self.describe_plug(to),
                previous = %self.describe_plug(previous),
                "replacing upstream connection"
            );
            self.plugs[previous.index()].remove_connection(to);
            self.plugs[to.index()].remove_connection(previous);
        }

        self.plugs[from.index()].add_connection(to);

        // The input mirrors its upstream from now on; fresh wiring is stale.
        let value = self.plugs[from.index()].value().clone();
        let input = &mut self.plugs[to.index()];
        input.add_connection(from);
        input.assign(value);
        input.set_dirty(true);

        tracing::trace!(
            from = %self.describe_plug(from),
            to = %self.describe_plug(to),
            "connected"
        );
        Ok(())
    }

    /// Remove the connection between two plugs, given in either order.
    pub fn disconnect(&mut self, a: PlugId, b: PlugId) -> Result<()> {
        let (from, to) = match self.plugs[a.index()].direction() {
            Direction::Output => (a, b),
            Direction::Input => (b, a),
        };

        let removed = self.plugs[from.index()].remove_connection(to);
        let mirrored = self.plugs[to.index()].remove_connection(from);
        if !(removed && mirrored) {
            return Err(ConnectionError::NotConnected {
                from: self.describe_plug(from),
                to: self.describe_plug(to),
            }
            .into());
        }

        tracing::trace!(
            from = %self.describe_plug(from),
            to = %self.describe_plug(to),
            "disconnected"
        );
        Ok(())
    }

    /// Assign a value to a plug.
    ///
    /// The plug becomes dirty unless the value equals the one it already
    /// holds. Assigning an output also hands the value to every connected
    /// input (one hop). A connected input is driven by its upstream and
    /// cannot be assigned.
    ///
    /// Returns whether the value changed.
    pub fn set_value(&mut self, plug: PlugId, value: Value) -> Result<bool> {
        let target = &self.plugs[plug.index()];
        if let Some(upstream) = target.upstream() {
            return Err(ConnectionError::ConnectedInput {
                input: self.describe_plug(plug),
                upstream: self.describe_plug(upstream),
            }
            .into());
        }

        let downstream = match target.direction() {
            Direction::Output => target.connections().to_vec(),
            Direction::Input => Vec::new(),
        };

        let changed = self.plugs[plug.index()].assign(value.clone());
        for input in downstream {
            self.plugs[input.index()].assign(value.clone());
        }

        tracing::trace!(plug = %self.describe_plug(plug), changed, "assigned value");
        Ok(changed)
    }

    /// Force a plug's dirty flag.
    pub fn set_dirty(&mut self, plug: PlugId, dirty: bool) {
        self.plugs[plug.index()].set_dirty(dirty);
    }

    /// The upstream output feeding an input plug.
    pub fn upstream(&self, input: PlugId) -> Option<PlugId> {
        self.plugs[input.index()].upstream()
    }
}
