//! Bounded render pipeline: limits, timeout, output checks.

use std::time::Duration;

use log::{debug, warn};

use crate::graph::Snapshot;
use crate::types::{DotbotError, DotbotResult, OutputFormat, DEFAULT_MAX_EDGES, DEFAULT_MAX_NODES};

use super::dot::{compile, GraphDescription};
use super::engine::LayoutEngine;

/// Default render timeout.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounds applied to every render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderLimits {
    /// Largest node count sent to the engine.
    pub max_nodes: usize,
    /// Largest edge count sent to the engine.
    pub max_edges: usize,
    /// Wall-clock budget for one engine run.
    pub timeout: Duration,
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES,
            max_edges: DEFAULT_MAX_EDGES,
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }
}

impl RenderLimits {
    /// Reject graphs larger than the limits.
    pub fn check(&self, node_count: usize, edge_count: usize) -> DotbotResult<()> {
        if node_count > self.max_nodes {
            return Err(DotbotError::ResourceLimitExceeded {
                resource: "nodes",
                count: node_count,
                limit: self.max_nodes,
            });
        }
        if edge_count > self.max_edges {
            return Err(DotbotError::ResourceLimitExceeded {
                resource: "edges",
                count: edge_count,
                limit: self.max_edges,
            });
        }
        Ok(())
    }
}

/// Image bytes returned by a successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

/// Drives a [`LayoutEngine`] under [`RenderLimits`].
///
/// Rendering never touches session state, so a failed, timed-out or dropped
/// render leaves nothing to clean up beyond the engine process itself.
pub struct RenderPipeline<E> {
    engine: E,
    limits: RenderLimits,
}

impl<E: LayoutEngine> RenderPipeline<E> {
    /// Create a pipeline around `engine`.
    pub fn new(engine: E, limits: RenderLimits) -> Self {
        Self { engine, limits }
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The limits in force.
    pub fn limits(&self) -> RenderLimits {
        self.limits
    }

    /// Compile a snapshot, rejecting oversized graphs before compiling.
    pub fn prepare(&self, snapshot: &Snapshot) -> DotbotResult<GraphDescription> {
        self.limits
            .check(snapshot.node_count(), snapshot.edge_count())?;
        Ok(compile(snapshot))
    }

    /// Render a compiled description.
    ///
    /// Size limits are checked before the engine is started. Engine errors,
    /// timeouts, empty output and output that does not look like `format` are
    /// all reported as render failures.
    pub async fn render(
        &self,
        description: &GraphDescription,
        format: OutputFormat,
    ) -> DotbotResult<RenderedImage> {
        self.limits
            .check(description.node_count(), description.edge_count())?;

        debug!(
            "Rendering {} nodes / {} edges as {} with {}",
            description.node_count(),
            description.edge_count(),
            format,
            self.engine.name()
        );

        let run = self.engine.layout(description.as_str(), format);
        let bytes = match tokio::time::timeout(self.limits.timeout, run).await {
            Ok(result) => result.inspect_err(|e| warn!("Layout engine failed: {e}"))?,
            Err(_) => {
                warn!("Layout engine timed out after {:?}", self.limits.timeout);
                return Err(DotbotError::RenderFailure {
                    diagnostic: format!("timed out after {}ms", self.limits.timeout.as_millis()),
                });
            }
        };

        if bytes.is_empty() {
            return Err(DotbotError::RenderFailure {
                diagnostic: "engine produced no output".to_string(),
            });
        }
        if !format.matches_signature(&bytes) {
            return Err(DotbotError::RenderFailure {
                diagnostic: format!("engine output is not a valid {format} image"),
            });
        }

        Ok(RenderedImage { format, bytes })
    }

    /// Compile and render a snapshot in one step.
    pub async fn render_snapshot(
        &self,
        snapshot: &Snapshot,
        format: OutputFormat,
    ) -> DotbotResult<RenderedImage> {
        let description = self.prepare(snapshot)?;
        self.render(&description, format).await
    }
}
