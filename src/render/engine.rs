//! External layout engines.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;

use log::debug;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::types::{DotbotError, DotbotResult, OutputFormat};

/// Longest engine diagnostic passed back to the user.
const MAX_DIAGNOSTIC_LEN: usize = 512;

/// Something that turns DOT text into image bytes.
///
/// Implementations must be cancel-safe: dropping the returned future must
/// release any external resource (the pipeline drops it on timeout).
pub trait LayoutEngine: Send + Sync {
    /// Name for logs.
    fn name(&self) -> &str;

    /// Lay out and render `description` in `format`.
    fn layout(
        &self,
        description: &str,
        format: OutputFormat,
    ) -> impl Future<Output = DotbotResult<Vec<u8>>> + Send;
}

/// Runs a Graphviz executable (`dot` by default) as a child process.
///
/// The description goes to stdin, the image comes from stdout, and stderr
/// becomes the diagnostic on failure. The child is killed if the future is
/// dropped.
#[derive(Debug, Clone)]
pub struct GraphvizEngine {
    program: PathBuf,
    layout: String,
}

impl GraphvizEngine {
    /// Use `program` with Graphviz layout `layout` (`dot`, `neato`, `circo`, ...).
    pub fn new(program: impl Into<PathBuf>, layout: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            layout: layout.into(),
        }
    }
}

impl Default for GraphvizEngine {
    fn default() -> Self {
        Self::new("dot", "dot")
    }
}

impl LayoutEngine for GraphvizEngine {
    fn name(&self) -> &str {
        &self.layout
    }

    async fn layout(&self, description: &str, format: OutputFormat) -> DotbotResult<Vec<u8>> {
        debug!(
            "Running {} -T{} -K{} on {} bytes",
            self.program.display(),
            format.name(),
            self.layout,
            description.len()
        );

        let mut child = Command::new(&self.program)
            .arg(format!("-T{}", format.name()))
            .arg(format!("-K{}", self.layout))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| failure(format!("failed to start {}: {e}", self.program.display())))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| failure("failed to open engine stdin".to_string()))?;
        let input = description.as_bytes();
        let write = async move {
            stdin.write_all(input).await?;
            stdin.shutdown().await
        };

        // Feed stdin while draining stdout so a large graph cannot deadlock.
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output.map_err(|e| failure(format!("engine I/O failed: {e}")))?;

        if !output.status.success() {
            let mut diagnostic = diagnostic(&output.stderr);
            if diagnostic.is_empty() {
                diagnostic = format!("engine exited with {}", output.status);
            }
            return Err(failure(diagnostic));
        }
        if let Err(e) = written {
            return Err(failure(format!("failed to write engine input: {e}")));
        }

        Ok(output.stdout)
    }
}

fn failure(diagnostic: String) -> DotbotError {
    DotbotError::RenderFailure { diagnostic }
}

/// Trimmed stderr, cut to [`MAX_DIAGNOSTIC_LEN`] bytes on a char boundary.
pub fn diagnostic(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= MAX_DIAGNOSTIC_LEN {
        return text.to_string();
    }
    let mut end = MAX_DIAGNOSTIC_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
