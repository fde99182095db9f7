//! Configuration loading from file and environment.

pub mod loader;

pub use loader::{load_config, Config, RenderConfig, SessionConfig};
