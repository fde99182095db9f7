//! In-memory diagram graph, the per-session data structure.

pub mod builder;
pub mod diagram_graph;
pub mod snapshot;

pub use builder::GraphBuilder;
pub use diagram_graph::{Applied, DiagramGraph, GraphLimits};
pub use snapshot::Snapshot;
