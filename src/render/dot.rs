//! Snapshot -> Graphviz DOT text.
//!
//! Output is a pure function of the snapshot: nodes and edges appear in
//! insertion order, attributes in key order, and every identifier, label and
//! value is emitted as an escaped quoted string.

use crate::graph::Snapshot;
use crate::types::{Attributes, Direction};

/// DOT keywords that cannot appear as bare attribute names.
const KEYWORDS: [&str; 6] = ["node", "edge", "graph", "digraph", "subgraph", "strict"];

/// Compiled input for the layout engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphDescription {
    text: String,
    node_count: usize,
    edge_count: usize,
}

impl GraphDescription {
    /// The DOT source.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consume into the DOT source.
    pub fn into_string(self) -> String {
        self.text
    }

    /// Size of the DOT source in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the DOT source is empty (never true for compiled output).
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Nodes in the compiled graph.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Edges in the compiled graph.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}

impl std::fmt::Display for GraphDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Compile a snapshot into DOT.
///
/// Always produces a `digraph`; undirected edges carry `dir="none"` unless the
/// user set `dir` explicitly.
pub fn compile(snapshot: &Snapshot) -> GraphDescription {
    let mut out = String::from("digraph \"diagram\" {\n");

    if !snapshot.graph_attributes.is_empty() {
        out.push_str("  graph");
        write_attributes(&mut out, None, &snapshot.graph_attributes, None);
        out.push_str(";\n");
    }

    for node in &snapshot.nodes {
        out.push_str(&format!("  \"{}\"", escape(&node.id)));
        write_attributes(&mut out, Some(&node.label), &node.attributes, None);
        out.push_str(";\n");
    }

    for edge in &snapshot.edges {
        out.push_str(&format!(
            "  \"{}\" -> \"{}\"",
            escape(&edge.source),
            escape(&edge.target)
        ));
        let implied = match edge.direction {
            Direction::Undirected if !edge.attributes.contains_key("dir") => Some(("dir", "none")),
            _ => None,
        };
        write_attributes(&mut out, edge.label.as_deref(), &edge.attributes, implied);
        out.push_str(";\n");
    }

    out.push_str("}\n");

    GraphDescription {
        text: out,
        node_count: snapshot.node_count(),
        edge_count: snapshot.edge_count(),
    }
}

/// Escape text for use inside a DOT double-quoted string.
///
/// Quotes and backslashes are escaped, newlines become `\n`, and other
/// control characters are dropped, so user text can never close the string.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

fn write_attributes(
    out: &mut String,
    label: Option<&str>,
    attributes: &Attributes,
    implied: Option<(&str, &str)>,
) {
    let mut parts: Vec<String> = Vec::with_capacity(attributes.len() + 2);
    if let Some(label) = label {
        parts.push(format!("label=\"{}\"", escape(label)));
    }
    for (key, value) in attributes {
        parts.push(format!("{}=\"{}\"", attribute_name(key), escape(value)));
    }
    if let Some((key, value)) = implied {
        parts.push(format!("{key}=\"{value}\""));
    }
    if !parts.is_empty() {
        out.push_str(&format!(" [{}]", parts.join(", ")));
    }
}

fn attribute_name(key: &str) -> String {
    if KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(key)) {
        format!("\"{}\"", escape(key))
    } else {
        key.to_string()
    }
}
