//! TimeLens CLI library.
//!
//! This crate provides the CLI interface and the native host bridge that
//! feeds browser events into the tracker.

mod cli;
pub mod commands;
mod config;
pub mod host;

pub use cli::{CategoryFilter, Cli, Commands};
pub use config::Config;
