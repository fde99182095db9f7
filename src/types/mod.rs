//! All data types for the dotbot library.

pub mod command;
pub mod edge;
pub mod error;
pub mod format;
pub mod node;

pub use command::{AttrTarget, Command, Edit, EdgeOptions};
pub use edge::{Direction, Edge};
pub use error::{DotbotError, DotbotResult, ParseError};
pub use format::OutputFormat;
pub use node::{Attributes, Node};

/// Maximum length of a node identifier, in bytes.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Maximum length of an attribute key, in bytes.
pub const MAX_ATTRIBUTE_KEY_LEN: usize = 32;

/// Maximum length of a label or attribute value, in bytes.
pub const MAX_TEXT_LEN: usize = 1024;

/// Default node-count limit for a render.
pub const DEFAULT_MAX_NODES: usize = 500;

/// Default edge-count limit for a render.
pub const DEFAULT_MAX_EDGES: usize = 2000;

/// Default node-count limit for a session graph.
pub const DEFAULT_GRAPH_MAX_NODES: usize = 1000;

/// Default edge-count limit for a session graph.
pub const DEFAULT_GRAPH_MAX_EDGES: usize = 5000;

/// Default number of undo steps retained per session.
pub const DEFAULT_HISTORY_DEPTH: usize = 16;

/// Returns the current time as Unix epoch microseconds.
pub fn now_micros() -> u64 {
    chrono::Utc::now().timestamp_micros() as u64
}

/// Check that `id` is usable as a node identifier.
///
/// Identifiers are non-empty, contain no whitespace or control characters,
/// and are at most [`MAX_IDENTIFIER_LEN`] bytes long.
pub fn validate_identifier(id: &str) -> DotbotResult<()> {
    if id.is_empty()
        || id.len() > MAX_IDENTIFIER_LEN
        || id.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(DotbotError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}

/// Check that `key` is a plain attribute name (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn validate_attribute_key(key: &str) -> DotbotResult<()> {
    let mut chars = key.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !head_ok
        || key.len() > MAX_ATTRIBUTE_KEY_LEN
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(DotbotError::InvalidAttribute {
            key: key.to_string(),
            reason: "attribute names must match [A-Za-z_][A-Za-z0-9_]*".to_string(),
        });
    }
    Ok(())
}

/// Check the length of a label or attribute value.
pub fn validate_text(key: &str, value: &str) -> DotbotResult<()> {
    if value.len() > MAX_TEXT_LEN {
        return Err(DotbotError::InvalidAttribute {
            key: key.to_string(),
            reason: format!("value exceeds {MAX_TEXT_LEN} bytes"),
        });
    }
    Ok(())
}
