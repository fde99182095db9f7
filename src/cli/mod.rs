//! Command-line harness for driving the engine locally.

pub mod commands;
pub mod serve;
