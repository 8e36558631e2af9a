//! Human-readable Graph Dumps
//!
//! Two text forms for diagnostics:
//!
//! - a tree of members, nested graphs indented under their parent
//!   ([`Network::render_tree`], also behind [`Network::display`]);
//! - a list of nodes in evaluation order, one block per node
//!   ([`Network::list_repr`]).
//!
//! ```text
//! outer
//! ├── a [multiply]
//! │   ├── in1 = 3
//! │   ├── in2 = 2
//! │   └── out = 6 -> b.in1
//! └── inner (graph)
//!     └── b [multiply] *
//!         ├── in1 = 6 <- a.out
//!         ├── in2 = 1
//!         └── out = null
//! ```
//!
//! A trailing `*` marks a dirty node.

use std::fmt::{self, Write};

use crate::error::Result;
use crate::graph::{Direction, GraphId, Member, Network, NodeId, PlugId};

const BRANCH: &str = "├── ";
const LAST: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

impl Network {
    /// Indented member tree of `graph`.
    pub fn render_tree(&self, graph: GraphId) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_tree(&mut out, graph);
        out
    }

    /// Nodes of `graph` in evaluation order with their plugs.
    pub fn list_repr(&self, graph: GraphId) -> Result<String> {
        let sequence = self.evaluation_sequence(graph)?;
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.graph(graph).name());
        for node in sequence {
            let _ = self.write_node_block(&mut out, node);
        }
        Ok(out)
    }

    /// `Display` adapter over [`render_tree`](Self::render_tree).
    pub fn display(&self, graph: GraphId) -> GraphDisplay<'_> {
        GraphDisplay {
            network: self,
            graph,
        }
    }

    fn write_tree(&self, out: &mut impl Write, graph: GraphId) -> fmt::Result {
        writeln!(out, "{}", self.graph(graph).name())?;
        self.write_members(out, graph, "")
    }

    fn write_members(&self, out: &mut impl Write, graph: GraphId, prefix: &str) -> fmt::Result {
        let members = self.graph(graph).members();
        for (index, member) in members.iter().enumerate() {
            let last = index + 1 == members.len();
            let (branch, indent) = if last { (LAST, SPACE) } else { (BRANCH, PIPE) };
            let child_prefix = format!("{prefix}{indent}");

            match *member {
                Member::Node(node) => {
                    writeln!(out, "{prefix}{branch}{}", self.node_label(node))?;
                    self.write_plugs(out, node, &child_prefix)?;
                }
                Member::Graph(child) => {
                    writeln!(out, "{prefix}{branch}{} (graph)", self.graph(child).name())?;
                    self.write_members(out, child, &child_prefix)?;
                }
            }
        }
        Ok(())
    }

    fn write_plugs(&self, out: &mut impl Write, node: NodeId, prefix: &str) -> fmt::Result {
        let node = self.node(node);
        let plugs: Vec<PlugId> = node
            .inputs()
            .values()
            .chain(node.outputs().values())
            .copied()
            .collect();
        for (index, plug) in plugs.iter().enumerate() {
            let branch = if index + 1 == plugs.len() { LAST } else { BRANCH };
            writeln!(out, "{prefix}{branch}{}", self.plug_label(*plug))?;
        }
        Ok(())
    }

    fn write_node_block(&self, out: &mut impl Write, id: NodeId) -> fmt::Result {
        let node = self.node(id);
        writeln!(out, "{}", self.node_label(id))?;
        writeln!(out, "  identifier: {}", node.identifier())?;
        if let Some(doc) = node.doc() {
            writeln!(out, "  doc: {doc}")?;
        }
        for (title, plugs) in [("inputs", node.inputs()), ("outputs", node.outputs())] {
            if plugs.is_empty() {
                continue;
            }
            writeln!(out, "  {title}:")?;
            for plug in plugs.values() {
                writeln!(out, "    {}", self.plug_label(*plug))?;
            }
        }
        Ok(())
    }

    fn node_label(&self, id: NodeId) -> String {
        let node = self.node(id);
        let dirty = if self.is_node_dirty(id) { " *" } else { "" };
        format!("{} [{}]{dirty}", node.name(), node.kind().tag())
    }

    fn plug_label(&self, id: PlugId) -> String {
        let plug = self.plug(id);
        let mut label = format!("{} = {}", plug.name(), plug.value());
        let peers: Vec<String> = plug
            .connections()
            .iter()
            .map(|other| self.describe_plug(*other))
            .collect();
        if !peers.is_empty() {
            let arrow = match plug.direction() {
                Direction::Input => "<-",
                Direction::Output => "->",
            };
            label.push_str(&format!(" {arrow} {}", peers.join(", ")));
        }
        label
    }
}

/// Renders a graph as its member tree.
pub struct GraphDisplay<'a> {
    network: &'a Network,
    graph: GraphId,
}

impl fmt::Display for GraphDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.network.write_tree(f, self.graph)
    }
}
