//! Edge direction and the core edge struct.

use serde::{Deserialize, Serialize};

use super::node::Attributes;

/// Whether an edge has an orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// `source -> target`.
    #[default]
    Directed,
    /// `source -- target`; equal to the reversed pair.
    Undirected,
}

impl Direction {
    /// Return a human-readable name for this direction.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Directed => "directed",
            Self::Undirected => "undirected",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A relationship between two nodes of the same graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Sequence number assigned by the graph on insertion.
    pub seq: u64,
    /// Source node ID.
    pub source: String,
    /// Target node ID.
    pub target: String,
    /// Optional edge label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Layout attributes such as `color` or `style`.
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    /// Orientation.
    pub direction: Direction,
}

impl Edge {
    /// Create a directed, unlabeled edge. `seq` is assigned by the graph.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            seq: 0,
            source: source.into(),
            target: target.into(),
            label: None,
            attributes: Attributes::new(),
            direction: Direction::Directed,
        }
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Add a single attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Whether this edge connects `source` to `target`.
    ///
    /// Undirected edges match the pair in either orientation.
    pub fn connects(&self, source: &str, target: &str) -> bool {
        let forward = self.source == source && self.target == target;
        match self.direction {
            Direction::Directed => forward,
            Direction::Undirected => forward || (self.source == target && self.target == source),
        }
    }

    /// Whether this edge touches node `id` at either end.
    pub fn is_incident_to(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }

    /// Structural equality used for idempotent insertion: same endpoints
    /// (modulo orientation for undirected edges), direction and label.
    pub fn same_link(&self, other: &Edge) -> bool {
        self.direction == other.direction
            && self.label == other.label
            && self.connects(&other.source, &other.target)
    }
}
