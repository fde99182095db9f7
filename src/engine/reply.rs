//! What goes back to the chat collaborator.

use serde::Serialize;

use crate::render::RenderedImage;
use crate::types::OutputFormat;

/// Outcome of one inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    /// A rendered diagram.
    Image {
        format: OutputFormat,
        #[serde(skip)]
        bytes: Vec<u8>,
    },
    /// Acknowledgement or informational text.
    Text { message: String },
    /// The command was rejected; session state is unchanged.
    Error { message: String },
}

impl Reply {
    /// Informational reply.
    pub fn text(message: impl Into<String>) -> Self {
        Self::Text {
            message: message.into(),
        }
    }

    /// Error reply.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether the command failed.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Text of a text or error reply.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Text { message } | Self::Error { message } => Some(message),
            Self::Image { .. } => None,
        }
    }

    /// Image bytes of an image reply.
    pub fn image_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Image { bytes, .. } => Some(bytes),
            _ => None,
        }
    }
}

impl From<RenderedImage> for Reply {
    fn from(image: RenderedImage) -> Self {
        Self::Image {
            format: image.format,
            bytes: image.bytes,
        }
    }
}
