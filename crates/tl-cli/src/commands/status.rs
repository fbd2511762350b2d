//! Status command for showing tracker state and stored data.

use std::io::Write;

use anyhow::{Context, Result};
use tl_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let paused = db.tracking_paused().context("failed to read pause flag")?;
    let sites = db.domain_totals().context("failed to read totals")?.len();
    let days = db.days().context("failed to read day buckets")?;

    writeln!(writer, "TimeLens status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(
        writer,
        "Tracking: {}",
        if paused { "paused" } else { "active" }
    )?;
    writeln!(writer, "Sites tracked: {sites}")?;
    writeln!(
        writer,
        "Retention: {} day(s)",
        config.tracker.retention_days
    )?;

    match (days.first(), days.last()) {
        (Some(oldest), Some(newest)) => writeln!(
            writer,
            "Days stored: {} ({oldest} to {newest})",
            days.len()
        )?,
        _ => writeln!(writer, "Days stored: 0")?,
    }

    Ok(())
}
