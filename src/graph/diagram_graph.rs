//! Core graph structure, a labeled multigraph with insertion-ordered nodes and edges.

use std::collections::HashMap;

use crate::types::{
    validate_attribute_key, validate_identifier, validate_text, AttrTarget, Attributes,
    DotbotError, DotbotResult, Edge, Edit, Node, DEFAULT_GRAPH_MAX_EDGES, DEFAULT_GRAPH_MAX_NODES,
};

use super::Snapshot;

/// Size limits enforced when nodes or edges are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphLimits {
    /// Maximum number of nodes.
    pub max_nodes: usize,
    /// Maximum number of edges.
    pub max_edges: usize,
}

impl GraphLimits {
    /// Limits that never trigger.
    pub fn unbounded() -> Self {
        Self {
            max_nodes: usize::MAX,
            max_edges: usize::MAX,
        }
    }
}

impl Default for GraphLimits {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_GRAPH_MAX_NODES,
            max_edges: DEFAULT_GRAPH_MAX_EDGES,
        }
    }
}

/// Outcome of a successful [`Edit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// `created` is false when an existing node was updated in place.
    NodeAdded { id: String, created: bool },
    /// `inserted` is false when a unique insert found an identical edge.
    EdgeAdded {
        source: String,
        target: String,
        inserted: bool,
    },
    NodeRemoved { id: String, edges_removed: usize },
    EdgesRemoved {
        source: String,
        target: String,
        count: usize,
    },
    AttributeSet {
        target: AttrTarget,
        key: String,
        matched: usize,
    },
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

impl std::fmt::Display for Applied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeAdded { id, created: true } => write!(f, "Added node {id}"),
            Self::NodeAdded { id, created: false } => write!(f, "Updated node {id}"),
            Self::EdgeAdded {
                source,
                target,
                inserted: true,
            } => write!(f, "Added edge {source} -> {target}"),
            Self::EdgeAdded {
                source,
                target,
                inserted: false,
            } => write!(f, "Edge {source} -> {target} already exists"),
            Self::NodeRemoved { id, edges_removed } => {
                write!(f, "Removed node {id} and {}", plural(*edges_removed, "edge"))
            }
            Self::EdgesRemoved {
                source,
                target,
                count,
            } => write!(f, "Removed {} {source} -> {target}", plural(*count, "edge")),
            Self::AttributeSet {
                target: AttrTarget::Edge { source, target },
                key,
                matched,
            } => write!(
                f,
                "Set {key} on {} {source} -> {target}",
                plural(*matched, "edge")
            ),
            Self::AttributeSet { target, key, .. } => write!(f, "Set {key} on {target}"),
        }
    }
}

/// A session's mutable diagram.
///
/// Invariant: every edge's endpoints name nodes present in `nodes`. Each
/// mutation validates fully before changing anything, so a failed call leaves
/// the graph untouched.
#[derive(Debug, Clone)]
pub struct DiagramGraph {
    /// All nodes, in insertion order.
    nodes: Vec<Node>,
    /// Node id -> position in `nodes`.
    index: HashMap<String, usize>,
    /// All edges, in insertion order.
    edges: Vec<Edge>,
    /// Graph-wide attributes.
    graph_attributes: Attributes,
    /// Next edge sequence number.
    next_seq: u64,
    /// Bumped by every mutation that actually changes the graph.
    revision: u64,
    limits: GraphLimits,
}

impl DiagramGraph {
    /// Create a new empty graph with default limits.
    pub fn new() -> Self {
        Self::with_limits(GraphLimits::default())
    }

    /// Create a new empty graph with the given limits.
    pub fn with_limits(limits: GraphLimits) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            graph_attributes: Attributes::new(),
            next_seq: 0,
            revision: 0,
            limits,
        }
    }

    /// Create from pre-existing data (used by the builder).
    pub fn from_parts(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        graph_attributes: Vec<(String, String)>,
        limits: GraphLimits,
    ) -> DotbotResult<Self> {
        let mut graph = Self::with_limits(limits);
        for node in nodes {
            graph.add_node(&node.id, Some(&node.label), node.attributes)?;
        }
        for edge in edges {
            graph.add_edge(edge, false)?;
        }
        for (key, value) in graph_attributes {
            graph.set_attribute(&AttrTarget::Graph, &key, &value)?;
        }
        Ok(graph)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph holds no nodes, edges or graph attributes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.graph_attributes.is_empty()
    }

    /// Change counter, bumped by every call that alters the graph. Compare it
    /// before and after a call to tell whether anything changed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The limits this graph enforces.
    pub fn limits(&self) -> GraphLimits {
        self.limits
    }

    /// Get a node by ID.
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    /// Whether a node with this ID exists.
    pub fn contains_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Graph-wide attributes.
    pub fn graph_attributes(&self) -> &Attributes {
        &self.graph_attributes
    }

    /// Edges connecting `source` to `target` (either way for undirected edges).
    pub fn edges_between<'a>(
        &'a self,
        source: &'a str,
        target: &'a str,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.connects(source, target))
    }

    /// Add a node, or update the label and merge the attributes of an
    /// existing node with the same ID.
    ///
    /// An attribute named `label` is treated as the label unless `label` is
    /// given explicitly.
    pub fn add_node(
        &mut self,
        id: &str,
        label: Option<&str>,
        attributes: Attributes,
    ) -> DotbotResult<&Node> {
        validate_identifier(id)?;
        let (label, attributes) = split_label(label, attributes)?;

        if let Some(&pos) = self.index.get(id) {
            let node = &mut self.nodes[pos];
            let mut changed = false;
            if let Some(label) = label {
                if node.label != label {
                    node.label = label;
                    changed = true;
                }
            }
            for (key, value) in attributes {
                if node.attributes.get(&key) != Some(&value) {
                    node.attributes.insert(key, value);
                    changed = true;
                }
            }
            if changed {
                self.revision += 1;
            }
            return Ok(&self.nodes[pos]);
        }

        check_limit("nodes", self.nodes.len() + 1, self.limits.max_nodes)?;

        let mut node = Node::new(id);
        if let Some(label) = label {
            node.label = label;
        }
        node.attributes = attributes;

        let pos = self.nodes.len();
        self.index.insert(node.id.clone(), pos);
        self.nodes.push(node);
        self.revision += 1;
        Ok(&self.nodes[pos])
    }

    /// Add an edge between two existing nodes.
    ///
    /// Endpoints are never created implicitly. With `unique`, an identical
    /// existing edge (same endpoints, direction and label) is returned instead
    /// of inserting a duplicate.
    pub fn add_edge(&mut self, edge: Edge, unique: bool) -> DotbotResult<&Edge> {
        if !self.contains_node(&edge.source) {
            return Err(DotbotError::UnknownNode(edge.source));
        }
        if !self.contains_node(&edge.target) {
            return Err(DotbotError::UnknownNode(edge.target));
        }

        let (label, attributes) = split_label(edge.label.as_deref(), edge.attributes)?;
        let mut edge = Edge {
            seq: 0,
            source: edge.source,
            target: edge.target,
            label,
            attributes,
            direction: edge.direction,
        };

        if unique {
            if let Some(pos) = self.edges.iter().position(|e| e.same_link(&edge)) {
                return Ok(&self.edges[pos]);
            }
        }

        check_limit("edges", self.edges.len() + 1, self.limits.max_edges)?;

        edge.seq = self.next_seq;
        self.next_seq += 1;
        self.revision += 1;
        let pos = self.edges.len();
        self.edges.push(edge);
        Ok(&self.edges[pos])
    }

    /// Remove a node and all its incident edges. Returns the node and the
    /// number of edges removed with it.
    pub fn remove_node(&mut self, id: &str) -> DotbotResult<(Node, usize)> {
        let pos = *self
            .index
            .get(id)
            .ok_or_else(|| DotbotError::UnknownNode(id.to_string()))?;

        let removed = self.nodes.remove(pos);

        let before = self.edges.len();
        self.edges.retain(|e| !e.is_incident_to(id));
        let edges_removed = before - self.edges.len();

        self.rebuild_index();
        self.revision += 1;

        Ok((removed, edges_removed))
    }

    /// Remove every edge connecting `source` to `target`, restricted to edges
    /// carrying `label` when one is given. Returns the number removed.
    pub fn remove_edge(
        &mut self,
        source: &str,
        target: &str,
        label: Option<&str>,
    ) -> DotbotResult<usize> {
        let before = self.edges.len();
        self.edges.retain(|e| {
            let label_matches = label.map_or(true, |l| e.label.as_deref() == Some(l));
            !(e.connects(source, target) && label_matches)
        });
        let removed = before - self.edges.len();
        if removed == 0 {
            return Err(DotbotError::UnknownEdge {
                from: source.to_string(),
                to: target.to_string(),
            });
        }
        self.revision += 1;
        Ok(removed)
    }

    /// Set an attribute on the graph, a node, or every edge of a pair.
    /// Returns the number of targets changed.
    ///
    /// The key `label` sets the node or edge label rather than an attribute.
    pub fn set_attribute(&mut self, on: &AttrTarget, key: &str, value: &str) -> DotbotResult<usize> {
        validate_attribute_key(key)?;
        validate_text(key, value)?;

        let (matched, changed) = match on {
            AttrTarget::Graph => (1, set_value(&mut self.graph_attributes, key, value)),
            AttrTarget::Node { id } => {
                let pos = *self
                    .index
                    .get(id)
                    .ok_or_else(|| DotbotError::UnknownTarget(on.to_string()))?;
                let node = &mut self.nodes[pos];
                let changed = if key == "label" {
                    let changed = node.label != value;
                    node.label = value.to_string();
                    changed
                } else {
                    set_value(&mut node.attributes, key, value)
                };
                (1, changed)
            }
            AttrTarget::Edge { source, target } => {
                let mut matched = 0;
                let mut changed = false;
                for edge in self.edges.iter_mut().filter(|e| e.connects(source, target)) {
                    if key == "label" {
                        changed |= edge.label.as_deref() != Some(value);
                        edge.label = Some(value.to_string());
                    } else {
                        changed |= set_value(&mut edge.attributes, key, value);
                    }
                    matched += 1;
                }
                if matched == 0 {
                    return Err(DotbotError::UnknownTarget(on.to_string()));
                }
                (matched, changed)
            }
        };
        if changed {
            self.revision += 1;
        }
        Ok(matched)
    }

    /// Apply a parsed edit. Either the whole edit takes effect or none of it.
    pub fn apply(&mut self, edit: &Edit) -> DotbotResult<Applied> {
        match edit {
            Edit::AddNode {
                id,
                label,
                attributes,
            } => {
                let created = !self.contains_node(id);
                self.add_node(id, label.as_deref(), attributes.clone())?;
                Ok(Applied::NodeAdded {
                    id: id.clone(),
                    created,
                })
            }
            Edit::AddEdge {
                source,
                target,
                label,
                attributes,
                options,
            } => {
                let before = self.next_seq;
                let mut edge = Edge::new(source.as_str(), target.as_str())
                    .with_direction(options.direction);
                edge.label = label.clone();
                edge.attributes = attributes.clone();
                self.add_edge(edge, options.unique)?;
                Ok(Applied::EdgeAdded {
                    source: source.clone(),
                    target: target.clone(),
                    inserted: self.next_seq != before,
                })
            }
            Edit::RemoveNode { id } => {
                let (_, edges_removed) = self.remove_node(id)?;
                Ok(Applied::NodeRemoved {
                    id: id.clone(),
                    edges_removed,
                })
            }
            Edit::RemoveEdge {
                source,
                target,
                label,
            } => {
                let count = self.remove_edge(source, target, label.as_deref())?;
                Ok(Applied::EdgesRemoved {
                    source: source.clone(),
                    target: target.clone(),
                    count,
                })
            }
            Edit::SetAttribute { target, key, value } => {
                let matched = self.set_attribute(target, key, value)?;
                Ok(Applied::AttributeSet {
                    target: target.clone(),
                    key: key.clone(),
                    matched,
                })
            }
        }
    }

    /// Drop every node, edge and graph attribute. Limits are kept.
    pub fn clear(&mut self) {
        if !self.is_empty() {
            self.revision += 1;
        }
        self.nodes.clear();
        self.index.clear();
        self.edges.clear();
        self.graph_attributes.clear();
    }

    /// Take an independently owned copy of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            graph_attributes: self.graph_attributes.clone(),
        }
    }

    /// Rebuild the id -> position index after a removal.
    fn rebuild_index(&mut self) {
        self.index.clear();
        for (pos, node) in self.nodes.iter().enumerate() {
            self.index.insert(node.id.clone(), pos);
        }
    }
}

impl Default for DiagramGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn check_limit(resource: &'static str, count: usize, limit: usize) -> DotbotResult<()> {
    if count > limit {
        return Err(DotbotError::ResourceLimitExceeded {
            resource,
            count,
            limit,
        });
    }
    Ok(())
}

/// Insert `key = value`, reporting whether the stored value changed.
fn set_value(attributes: &mut Attributes, key: &str, value: &str) -> bool {
    if attributes.get(key).map(String::as_str) == Some(value) {
        return false;
    }
    attributes.insert(key.to_string(), value.to_string());
    true
}

/// Validate attributes and pull a `label` attribute out into the label slot.
fn split_label(
    label: Option<&str>,
    mut attributes: Attributes,
) -> DotbotResult<(Option<String>, Attributes)> {
    for (key, value) in &attributes {
        validate_attribute_key(key)?;
        validate_text(key, value)?;
    }
    let from_attributes = attributes.remove("label");
    let label = label.map(str::to_string).or(from_attributes);
    if let Some(label) = &label {
        validate_text("label", label)?;
    }
    Ok((label, attributes))
}
