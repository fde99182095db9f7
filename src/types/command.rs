//! Parsed user intents.

use serde::Serialize;

use super::edge::Direction;
use super::format::OutputFormat;
use super::node::Attributes;

/// What a `set-attribute` command points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttrTarget {
    /// Graph-wide attributes (`rankdir`, `bgcolor`, ...).
    Graph,
    /// A node by identifier.
    Node { id: String },
    /// Every edge connecting the pair.
    Edge { source: String, target: String },
}

impl std::fmt::Display for AttrTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Graph => write!(f, "graph"),
            Self::Node { id } => write!(f, "node '{id}'"),
            Self::Edge { source, target } => write!(f, "edge {source} -> {target}"),
        }
    }
}

/// Insertion options for `add-edge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EdgeOptions {
    /// Orientation of the new edge.
    pub direction: Direction,
    /// Skip insertion when an identical edge already exists.
    pub unique: bool,
}

/// A mutation of a session's graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    AddNode {
        id: String,
        label: Option<String>,
        attributes: Attributes,
    },
    AddEdge {
        source: String,
        target: String,
        label: Option<String>,
        attributes: Attributes,
        options: EdgeOptions,
    },
    RemoveNode {
        id: String,
    },
    RemoveEdge {
        source: String,
        target: String,
        label: Option<String>,
    },
    SetAttribute {
        target: AttrTarget,
        key: String,
        value: String,
    },
}

impl Edit {
    /// Short verb for logs and acknowledgements.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::AddNode { .. } => "add-node",
            Self::AddEdge { .. } => "add-edge",
            Self::RemoveNode { .. } => "remove-node",
            Self::RemoveEdge { .. } => "remove-edge",
            Self::SetAttribute { .. } => "set-attribute",
        }
    }
}

/// A validated command. Never partially applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Mutate the graph.
    Edit(Edit),
    /// Compile and render the current graph. `None` uses the configured format.
    Render { format: Option<OutputFormat> },
    /// Drop every node, edge and graph attribute.
    Reset,
    /// Restore the graph as it was before the last mutation or reset.
    Undo,
    /// Describe the command vocabulary.
    Help,
}

impl Command {
    /// Short verb for logs.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Edit(edit) => edit.verb(),
            Self::Render { .. } => "render",
            Self::Reset => "reset",
            Self::Undo => "undo",
            Self::Help => "help",
        }
    }
}

impl From<Edit> for Command {
    fn from(edit: Edit) -> Self {
        Self::Edit(edit)
    }
}
