//! Dotbot: chat-driven diagram sessions rendered through Graphviz.
//!
//! Each chat session owns a graph that is edited through short text
//! commands (`add-node`, `add-edge`, `set-attribute`, ...). On `render` the
//! graph is compiled to DOT and handed to an external layout engine, and the
//! resulting image bytes are returned to the caller.

pub mod cli;
pub mod config;
pub mod engine;
pub mod graph;
pub mod parser;
pub mod render;
pub mod session;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::{load_config, Config, RenderConfig, SessionConfig};
pub use engine::{DiagramEngine, Reply};
pub use graph::{Applied, DiagramGraph, GraphBuilder, GraphLimits, Snapshot};
pub use parser::{help_text, parse, Verb};
pub use render::{
    compile, GraphDescription, GraphvizEngine, LayoutEngine, RenderLimits, RenderPipeline,
    RenderedImage,
};
pub use session::{spawn_eviction_sweeper, Session, SessionId, SessionState, SessionStore};
pub use types::{
    now_micros, AttrTarget, Attributes, Command, Direction, DotbotError, DotbotResult, Edge,
    EdgeOptions, Edit, Node, OutputFormat, ParseError, DEFAULT_MAX_EDGES, DEFAULT_MAX_NODES,
    MAX_IDENTIFIER_LEN,
};
