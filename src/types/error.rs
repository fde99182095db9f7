//! Error types for the dotbot library.

use thiserror::Error;

/// A command line that could not be turned into a [`Command`](super::Command).
///
/// `column` is a character offset into `input`; the `Display` output points at
/// it with a caret so the user can see where parsing stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable reason.
    pub reason: String,
    /// The raw text as received.
    pub input: String,
    /// Character offset of the offending token.
    pub column: usize,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(reason: impl Into<String>, input: impl Into<String>, column: usize) -> Self {
        Self {
            reason: reason.into(),
            input: input.into(),
            column,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // One extra space for the opening quote.
        write!(
            f,
            "\"{}\"\n{}^\n{}",
            self.input,
            " ".repeat(self.column + 1),
            self.reason
        )
    }
}

impl std::error::Error for ParseError {}

/// All errors that can occur in the dotbot library.
#[derive(Error, Debug)]
pub enum DotbotError {
    /// Malformed command text.
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// Node not found by ID.
    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    /// No edge between the given endpoints.
    #[error("Unknown edge {from} -> {to}")]
    UnknownEdge { from: String, to: String },

    /// Attribute target does not exist.
    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    /// Identifier is empty, too long, or contains whitespace.
    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// Attribute name or value is not acceptable.
    #[error("Invalid attribute '{key}': {reason}")]
    InvalidAttribute { key: String, reason: String },

    /// The graph would exceed (or already exceeds) a configured size limit.
    #[error("Too many {resource}: {count} > {limit}")]
    ResourceLimitExceeded {
        resource: &'static str,
        count: usize,
        limit: usize,
    },

    /// The layout engine failed, timed out, or produced unusable output.
    #[error("Render failed: {diagnostic}")]
    RenderFailure { diagnostic: String },

    /// Undo requested with an empty history.
    #[error("Nothing to undo")]
    NothingToUndo,

    /// The session was evicted or closed while the command waited for it.
    #[error("Session '{0}' is closed")]
    SessionClosed(String),

    /// Configuration could not be loaded or is invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DotbotError {
    /// True for errors caused by referencing something absent from the graph.
    pub fn is_referential(&self) -> bool {
        matches!(
            self,
            Self::UnknownNode(_) | Self::UnknownEdge { .. } | Self::UnknownTarget(_)
        )
    }

    /// True for render-stage failures, timeouts included.
    pub fn is_render_failure(&self) -> bool {
        matches!(self, Self::RenderFailure { .. })
    }
}

/// Convenience result type for dotbot operations.
pub type DotbotResult<T> = Result<T, DotbotError>;
