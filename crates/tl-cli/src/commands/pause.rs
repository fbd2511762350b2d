//! Pause and resume commands: set the persisted pause flag.
//!
//! A running `tl run` host notices the change on its next database poll.

use std::io::Write;

use anyhow::{Context, Result};
use tl_db::Database;

const fn state_label(paused: bool) -> &'static str {
    if paused { "paused" } else { "resumed" }
}

/// Sets the pause flag. Returns whether it changed.
pub fn run<W: Write>(writer: &mut W, db: &mut Database, paused: bool) -> Result<bool> {
    let current = db.tracking_paused().context("failed to read pause flag")?;
    if current == paused {
        writeln!(writer, "Tracking is already {}.", state_label(paused))?;
        return Ok(false);
    }

    db.set_tracking_paused(paused)
        .context("failed to write pause flag")?;
    tracing::info!(paused, "pause flag updated");
    writeln!(writer, "Tracking {}.", state_label(paused))?;
    Ok(true)
}
