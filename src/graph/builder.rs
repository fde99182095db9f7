//! Fluent API for building DiagramGraph instances.

use crate::types::{DotbotResult, Edge, Node};

use super::{DiagramGraph, GraphLimits};

/// Fluent builder for constructing a DiagramGraph.
///
/// Nothing is validated until [`build`](Self::build), which applies the same
/// rules as incremental mutation.
pub struct GraphBuilder {
    limits: GraphLimits,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    graph_attributes: Vec<(String, String)>,
}

impl GraphBuilder {
    /// Create a new builder with the default limits.
    pub fn new() -> Self {
        Self::with_limits(GraphLimits::default())
    }

    /// Create a new builder with specific limits.
    pub fn with_limits(limits: GraphLimits) -> Self {
        Self {
            limits,
            nodes: Vec::new(),
            edges: Vec::new(),
            graph_attributes: Vec::new(),
        }
    }

    /// Add a node labeled with its own identifier.
    pub fn node(mut self, id: &str) -> Self {
        self.nodes.push(Node::new(id));
        self
    }

    /// Add a node with an explicit label.
    pub fn labeled_node(mut self, id: &str, label: &str) -> Self {
        self.nodes.push(Node::new(id).with_label(label));
        self
    }

    /// Add a fully specified node.
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add a directed, unlabeled edge.
    pub fn link(mut self, source: &str, target: &str) -> Self {
        self.edges.push(Edge::new(source, target));
        self
    }

    /// Add a directed, labeled edge.
    pub fn labeled_link(mut self, source: &str, target: &str, label: &str) -> Self {
        self.edges.push(Edge::new(source, target).with_label(label));
        self
    }

    /// Add a fully specified edge.
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Set a graph-level attribute.
    pub fn graph_attribute(mut self, key: &str, value: &str) -> Self {
        self.graph_attributes
            .push((key.to_string(), value.to_string()));
        self
    }

    /// Build the final DiagramGraph.
    pub fn build(self) -> DotbotResult<DiagramGraph> {
        DiagramGraph::from_parts(self.nodes, self.edges, self.graph_attributes, self.limits)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
