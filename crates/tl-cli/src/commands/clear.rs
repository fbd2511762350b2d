//! Clear command: irreversibly erases all tracked data.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tl_db::Database;

const PROMPT: &str =
    "Are you sure you want to clear all tracking data? This action cannot be undone. [y/N] ";

/// Clears the database after confirmation. Returns whether data was cleared.
pub fn run<R: BufRead, W: Write>(
    input: &mut R,
    writer: &mut W,
    db: &mut Database,
    yes: bool,
) -> Result<bool> {
    if !yes {
        write!(writer, "{PROMPT}")?;
        writer.flush()?;
        let mut answer = String::new();
        input
            .read_line(&mut answer)
            .context("failed to read confirmation")?;
        if !is_confirmation(&answer) {
            writeln!(writer, "Aborted.")?;
            return Ok(false);
        }
    }

    db.clear().context("failed to clear tracking data")?;
    writeln!(writer, "All data has been cleared.")?;
    Ok(true)
}

fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
