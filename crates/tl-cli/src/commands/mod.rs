//! CLI subcommand implementations.

pub mod clear;
pub mod export;
pub mod pause;
pub mod report;
pub mod run;
pub mod status;
pub mod summary;
pub mod sweep;
pub mod util;
