//! High-level command handling.

pub mod dispatch;
pub mod reply;

pub use dispatch::DiagramEngine;
pub use reply::Reply;
