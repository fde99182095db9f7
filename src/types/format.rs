//! Rendered image formats.

use serde::{Deserialize, Serialize};

/// Output format requested from the layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Portable Network Graphics.
    #[default]
    Png,
    /// Scalable Vector Graphics.
    Svg,
    /// Portable Document Format.
    Pdf,
}

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const PDF_SIGNATURE: &[u8] = b"%PDF";

impl OutputFormat {
    /// All supported formats.
    pub const ALL: [OutputFormat; 3] = [Self::Png, Self::Svg, Self::Pdf];

    /// Return the format name (also the graphviz `-T` value).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }

    /// Parse a format from a string name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "svg" => Some(Self::Svg),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// File extension for saved renders.
    pub fn extension(&self) -> &'static str {
        self.name()
    }

    /// MIME type, for collaborators that upload the bytes.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Svg => "image/svg+xml",
            Self::Pdf => "application/pdf",
        }
    }

    /// Cheap check that `bytes` plausibly is an image of this format.
    pub fn matches_signature(&self, bytes: &[u8]) -> bool {
        match self {
            Self::Png => bytes.starts_with(PNG_SIGNATURE),
            Self::Pdf => bytes.starts_with(PDF_SIGNATURE),
            Self::Svg => {
                let head = &bytes[..bytes.len().min(4096)];
                String::from_utf8_lossy(head).contains("<svg")
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
