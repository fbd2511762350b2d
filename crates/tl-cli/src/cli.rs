//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tl_core::Category;

/// Browser activity time tracker.
///
/// Attributes time spent in the browser to domains, classifies them as
/// productive, unproductive or neutral, and reports where the time went.
#[derive(Debug, Parser)]
#[command(name = "tl", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the tracking host: read browser events as JSON lines on stdin.
    ///
    /// Replies and change notifications are written as JSON lines on stdout.
    Run,

    /// Quick overview: total time, productivity and top sites.
    Summary {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Detailed report of all tracked sites.
    Report {
        /// Output as JSON.
        #[arg(long)]
        json: bool,

        /// Only list sites in this category.
        #[arg(long, value_enum, default_value_t = CategoryFilter::All)]
        filter: CategoryFilter,

        /// Report on today's bucket instead of lifetime totals.
        #[arg(long, conflicts_with = "day")]
        today: bool,

        /// Report on one day's bucket (YYYY-MM-DD).
        #[arg(long)]
        day: Option<NaiveDate>,
    },

    /// Write the lifetime report to a JSON file.
    Export {
        /// Destination file. Defaults to `timelens-report-YYYY-MM-DD.json`.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Erase all tracked data.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Pause tracking until `tl resume`.
    Pause,

    /// Resume tracking after `tl pause`.
    Resume,

    /// Delete day buckets older than the retention window.
    Sweep,

    /// Show database location, pause state and retained days.
    Status,
}

/// Category filter for the detailed report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryFilter {
    All,
    Productive,
    Unproductive,
    Neutral,
}

impl CategoryFilter {
    /// The category this filter selects, or `None` for all.
    pub const fn category(self) -> Option<Category> {
        match self {
            Self::All => None,
            Self::Productive => Some(Category::Productive),
            Self::Unproductive => Some(Category::Unproductive),
            Self::Neutral => Some(Category::Neutral),
        }
    }
}
