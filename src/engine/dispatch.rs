//! Routes parsed commands to sessions, the graph and the render pipeline.

use std::sync::Arc;

use log::{debug, warn};

use crate::config::Config;
use crate::parser::{help_text, parse};
use crate::render::{LayoutEngine, RenderPipeline, RenderedImage};
use crate::session::SessionStore;
use crate::types::{Command, DotbotResult, OutputFormat};

use super::Reply;

/// The core service: one instance serves every conversation.
///
/// Commands for different sessions run fully in parallel; commands for the
/// same session are serialized by that session's lock. Rendering copies the
/// graph under the lock and runs the engine after releasing it.
pub struct DiagramEngine<E> {
    store: Arc<SessionStore>,
    pipeline: RenderPipeline<E>,
    default_format: OutputFormat,
}

impl<E: LayoutEngine> DiagramEngine<E> {
    /// Assemble an engine from its parts.
    pub fn new(
        store: Arc<SessionStore>,
        pipeline: RenderPipeline<E>,
        default_format: OutputFormat,
    ) -> Self {
        Self {
            store,
            pipeline,
            default_format,
        }
    }

    /// Build the store and pipeline described by `config` around `engine`.
    pub fn from_config(config: &Config, engine: E) -> Self {
        let store = Arc::new(SessionStore::new(
            config.graph_limits(),
            config.session.history_depth,
        ));
        let pipeline = RenderPipeline::new(engine, config.render_limits());
        Self::new(store, pipeline, config.render.format)
    }

    /// The session store (shared with the idle sweeper).
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// The render pipeline.
    pub fn pipeline(&self) -> &RenderPipeline<E> {
        &self.pipeline
    }

    /// Handle one raw message. Every failure becomes an error reply.
    pub async fn handle(&self, session_id: &str, text: &str) -> Reply {
        let command = match parse(text) {
            Ok(command) => command,
            Err(e) => {
                debug!("[{session_id}] parse error: {}", e.reason);
                return Reply::error(e.to_string());
            }
        };
        match self.execute(session_id, command).await {
            Ok(reply) => reply,
            Err(e) => {
                debug!("[{session_id}] command failed: {e}");
                Reply::error(e.to_string())
            }
        }
    }

    /// Execute a parsed command against a session.
    pub async fn execute(&self, session_id: &str, command: Command) -> DotbotResult<Reply> {
        debug!("[{session_id}] {}", command.verb());
        match command {
            Command::Edit(edit) => {
                let mut session = self.store.acquire(session_id).await;
                let applied = session.apply(&edit)?;
                Ok(Reply::text(applied.to_string()))
            }
            Command::Render { format } => {
                self.render(session_id, format.unwrap_or(self.default_format))
                    .await
            }
            Command::Reset => {
                let mut session = self.store.acquire(session_id).await;
                if session.reset() {
                    Ok(Reply::text("Diagram cleared"))
                } else {
                    Ok(Reply::text("Diagram is already empty"))
                }
            }
            Command::Undo => {
                let mut session = self.store.acquire(session_id).await;
                session.undo()?;
                let graph = session.graph();
                Ok(Reply::text(format!(
                    "Undone; {} nodes, {} edges",
                    graph.node_count(),
                    graph.edge_count()
                )))
            }
            Command::Help => Ok(Reply::text(help_text())),
        }
    }

    /// Render a session's current graph.
    pub async fn render(&self, session_id: &str, format: OutputFormat) -> DotbotResult<Reply> {
        let snapshot = {
            let mut session = self.store.acquire(session_id).await;
            session.touch();
            session.snapshot()
        };

        if snapshot.node_count() == 0 {
            return Ok(Reply::text("Nothing to draw yet; add a node first"));
        }

        let description = self.pipeline.prepare(&snapshot)?;

        if let Some(image) = self.cached(session_id, description.as_str(), format).await {
            debug!("[{session_id}] render cache hit");
            return Ok(image.into());
        }

        let image = self
            .pipeline
            .render(&description, format)
            .await
            .inspect_err(|e| warn!("[{session_id}] render failed: {e}"))?;

        if let Some(handle) = self.store.get(session_id) {
            let mut session = handle.lock().await;
            if !session.is_closed() {
                session.store_render(description.into_string(), image.clone());
            }
        }

        Ok(image.into())
    }

    async fn cached(
        &self,
        session_id: &str,
        description: &str,
        format: OutputFormat,
    ) -> Option<RenderedImage> {
        let handle = self.store.get(session_id)?;
        let session = handle.lock().await;
        session.cached_render(description, format)
    }
}
