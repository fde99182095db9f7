//! One conversation's graph, undo history and render cache.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::graph::{Applied, DiagramGraph, GraphLimits, Snapshot};
use crate::render::RenderedImage;
use crate::types::{now_micros, DotbotError, DotbotResult, Edit, OutputFormat};

/// Opaque identifier of a conversation, supplied by the chat collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state. Rendering does not change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing drawn yet, or just reset.
    Empty,
    /// At least one node, edge or graph attribute.
    Populated,
}

/// Last successful render, reused while the compiled description is unchanged.
#[derive(Debug, Clone)]
struct CachedRender {
    description: String,
    image: RenderedImage,
}

/// A conversation's diagram state.
///
/// Sessions live behind the store's per-session lock; every method here runs
/// with that lock held.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    graph: DiagramGraph,
    /// Previous graphs, oldest first.
    history: VecDeque<DiagramGraph>,
    history_depth: usize,
    /// Unix epoch microseconds.
    created_at: u64,
    last_activity: Instant,
    mutations: u64,
    closed: bool,
    render_cache: Option<CachedRender>,
}

impl Session {
    /// Create an empty session.
    pub fn new(id: SessionId, limits: GraphLimits, history_depth: usize) -> Self {
        Self {
            id,
            graph: DiagramGraph::with_limits(limits),
            history: VecDeque::new(),
            history_depth,
            created_at: now_micros(),
            last_activity: Instant::now(),
            mutations: 0,
            closed: false,
            render_cache: None,
        }
    }

    /// The session identifier.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Read access to the graph.
    pub fn graph(&self) -> &DiagramGraph {
        &self.graph
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        if self.graph.is_empty() {
            SessionState::Empty
        } else {
            SessionState::Populated
        }
    }

    /// Creation time, Unix epoch microseconds.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Number of successful graph-changing edits.
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    /// Number of undo steps available.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Time since the last command touched this session.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    /// Record activity.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Whether the session has been evicted or closed. A closed session must
    /// not be used; the store hands out a fresh one instead.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Apply an edit. On error the graph and history are unchanged; an edit
    /// that leaves the graph as it was adds no undo step.
    pub fn apply(&mut self, edit: &Edit) -> DotbotResult<Applied> {
        self.touch();
        let before = (self.history_depth > 0).then(|| self.graph.clone());
        let revision = self.graph.revision();
        let applied = self.graph.apply(edit)?;
        if self.graph.revision() != revision {
            if let Some(before) = before {
                self.remember(before);
            }
            self.mutations += 1;
        }
        Ok(applied)
    }

    /// Clear the graph. Returns false if it was already empty.
    pub fn reset(&mut self) -> bool {
        self.touch();
        if self.graph.is_empty() {
            return false;
        }
        let limits = self.graph.limits();
        let before = std::mem::replace(&mut self.graph, DiagramGraph::with_limits(limits));
        if self.history_depth > 0 {
            self.remember(before);
        }
        self.mutations += 1;
        true
    }

    /// Restore the graph as it was before the last edit or reset.
    pub fn undo(&mut self) -> DotbotResult<()> {
        self.touch();
        let previous = self.history.pop_back().ok_or(DotbotError::NothingToUndo)?;
        self.graph = previous;
        self.mutations += 1;
        Ok(())
    }

    /// Independent copy of the current graph.
    pub fn snapshot(&self) -> Snapshot {
        self.graph.snapshot()
    }

    /// Cached image if the last render used `description` and `format`.
    pub fn cached_render(&self, description: &str, format: OutputFormat) -> Option<RenderedImage> {
        self.render_cache
            .as_ref()
            .filter(|c| c.image.format == format && c.description == description)
            .map(|c| c.image.clone())
    }

    /// Remember a successful render.
    pub fn store_render(&mut self, description: String, image: RenderedImage) {
        self.render_cache = Some(CachedRender { description, image });
    }

    /// Mark closed and drop all state.
    pub(crate) fn close(&mut self) {
        self.closed = true;
        self.graph.clear();
        self.history.clear();
        self.render_cache = None;
    }

    fn remember(&mut self, graph: DiagramGraph) {
        if self.history.len() == self.history_depth {
            self.history.pop_front();
        }
        self.history.push_back(graph);
    }
}
