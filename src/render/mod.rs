//! Snapshot compilation and the bounded layout-engine pipeline.

pub mod dot;
pub mod engine;
pub mod pipeline;

pub use dot::{compile, escape, GraphDescription};
pub use engine::{GraphvizEngine, LayoutEngine};
pub use pipeline::{RenderLimits, RenderPipeline, RenderedImage};
