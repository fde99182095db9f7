//! TOML config file plus `DOTBOT_*` environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::graph::GraphLimits;
use crate::render::RenderLimits;
use crate::types::{
    DotbotError, DotbotResult, OutputFormat, DEFAULT_GRAPH_MAX_EDGES, DEFAULT_GRAPH_MAX_NODES,
    DEFAULT_HISTORY_DEPTH, DEFAULT_MAX_EDGES, DEFAULT_MAX_NODES,
};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session lifecycle settings.
    pub session: SessionConfig,
    /// Render pipeline settings.
    pub render: RenderConfig,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
}

/// `[session]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Evict sessions idle this long.
    pub idle_timeout_secs: u64,
    /// How often the idle sweep runs.
    pub sweep_interval_secs: u64,
    /// Undo steps kept per session (0 disables undo).
    pub history_depth: usize,
    /// Node cap enforced on mutation.
    pub max_nodes: usize,
    /// Edge cap enforced on mutation.
    pub max_edges: usize,
}

/// `[render]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Engine wall-clock budget in milliseconds.
    pub timeout_ms: u64,
    /// Largest node count sent to the engine.
    pub max_nodes: usize,
    /// Largest edge count sent to the engine.
    pub max_edges: usize,
    /// Format used when a render command names none.
    pub format: OutputFormat,
    /// Graphviz executable.
    pub program: String,
    /// Graphviz layout (`-K`).
    pub layout: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            render: RenderConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 1800,
            sweep_interval_secs: 60,
            history_depth: DEFAULT_HISTORY_DEPTH,
            max_nodes: DEFAULT_GRAPH_MAX_NODES,
            max_edges: DEFAULT_GRAPH_MAX_EDGES,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_nodes: DEFAULT_MAX_NODES,
            max_edges: DEFAULT_MAX_EDGES,
            format: OutputFormat::Png,
            program: "dot".to_string(),
            layout: "dot".to_string(),
        }
    }
}

impl Config {
    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> DotbotResult<Self> {
        toml::from_str(content).map_err(|e| DotbotError::Config(format!("Failed to parse config: {e}")))
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> DotbotResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DOTBOT_IDLE_TIMEOUT_SECS") {
            self.session.idle_timeout_secs = parse_number("DOTBOT_IDLE_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("DOTBOT_HISTORY_DEPTH") {
            self.session.history_depth = parse_number("DOTBOT_HISTORY_DEPTH", &v)?;
        }
        if let Some(v) = lookup("DOTBOT_GRAPH_MAX_NODES") {
            self.session.max_nodes = parse_number("DOTBOT_GRAPH_MAX_NODES", &v)?;
        }
        if let Some(v) = lookup("DOTBOT_GRAPH_MAX_EDGES") {
            self.session.max_edges = parse_number("DOTBOT_GRAPH_MAX_EDGES", &v)?;
        }
        if let Some(v) = lookup("DOTBOT_RENDER_TIMEOUT_MS") {
            self.render.timeout_ms = parse_number("DOTBOT_RENDER_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("DOTBOT_MAX_NODES") {
            self.render.max_nodes = parse_number("DOTBOT_MAX_NODES", &v)?;
        }
        if let Some(v) = lookup("DOTBOT_MAX_EDGES") {
            self.render.max_edges = parse_number("DOTBOT_MAX_EDGES", &v)?;
        }
        if let Some(v) = lookup("DOTBOT_OUTPUT_FORMAT") {
            self.render.format = OutputFormat::from_name(v.trim()).ok_or_else(|| {
                DotbotError::Config(format!("DOTBOT_OUTPUT_FORMAT: unknown format '{v}'"))
            })?;
        }
        if let Some(v) = lookup("DOTBOT_DOT_PROGRAM") {
            self.render.program = v;
        }
        Ok(())
    }

    /// Reject settings that would make the service unusable.
    pub fn validate(&self) -> DotbotResult<()> {
        let checks = [
            ("session.idle_timeout_secs", self.session.idle_timeout_secs as usize),
            ("session.sweep_interval_secs", self.session.sweep_interval_secs as usize),
            ("session.max_nodes", self.session.max_nodes),
            ("session.max_edges", self.session.max_edges),
            ("render.timeout_ms", self.render.timeout_ms as usize),
            ("render.max_nodes", self.render.max_nodes),
            ("render.max_edges", self.render.max_edges),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(DotbotError::Config(format!("{name} must be greater than 0")));
            }
        }
        if self.render.program.trim().is_empty() {
            return Err(DotbotError::Config("render.program must not be empty".to_string()));
        }
        Ok(())
    }

    /// Idle threshold for eviction.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session.idle_timeout_secs)
    }

    /// Interval between idle sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session.sweep_interval_secs)
    }

    /// Mutation-time graph caps.
    pub fn graph_limits(&self) -> GraphLimits {
        GraphLimits {
            max_nodes: self.session.max_nodes,
            max_edges: self.session.max_edges,
        }
    }

    /// Render-time bounds.
    pub fn render_limits(&self) -> RenderLimits {
        RenderLimits {
            max_nodes: self.render.max_nodes,
            max_edges: self.render.max_edges,
            timeout: Duration::from_millis(self.render.timeout_ms),
        }
    }
}

/// Load configuration: defaults, then the TOML file if given, then
/// `DOTBOT_*` environment variables, then validation.
pub fn load_config(path: Option<&Path>) -> DotbotResult<Config> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                DotbotError::Config(format!("Failed to read config file {}: {e}", path.display()))
            })?;
            Config::from_toml_str(&content)?
        }
        None => Config::default(),
    };
    config.apply_overrides(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> DotbotResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| DotbotError::Config(format!("{name}: expected a number, got '{raw}'")))
}
