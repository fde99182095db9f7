//! Diagram nodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Attribute map (name -> value). Ordered so output is stable.
pub type Attributes = BTreeMap<String, String>;

/// A single diagram node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the owning graph.
    pub id: String,
    /// Display text. Defaults to the identifier.
    pub label: String,
    /// Layout attributes such as `shape` or `color`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl Node {
    /// Create a node whose label is its identifier.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            attributes: Attributes::new(),
        }
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Add a single attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute value.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
