//! Sweep command: one-shot retention sweep for cron-style scheduling.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tl_core::retention;
use tl_db::Database;

/// Deletes day buckets outside the retention window at local time `now`.
pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    retention_days: u32,
    now: NaiveDateTime,
) -> Result<usize> {
    let removed = retention::sweep(db, now, retention_days).context("retention sweep failed")?;
    let first_kept = retention::first_retained_day(now, retention_days);
    writeln!(
        writer,
        "Removed {removed} expired day(s); keeping days from {}.",
        first_kept.format("%Y-%m-%d")
    )?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use insta::assert_snapshot;
    use tl_core::Domain;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sweep_removes_expired_days_only() {
        let mut db = Database::open_in_memory().unwrap();
        let github = Domain::new("github.com").unwrap();
        for day in [date(2025, 2, 10), date(2025, 2, 12), date(2025, 3, 14)] {
            db.add_time(&github, day, 60_000).unwrap();
        }
        let now = date(2025, 3, 15).and_hms_opt(12, 0, 0).unwrap();

        let mut output = Vec::new();
        let removed = run(&mut output, &mut db, 30, now).unwrap();

        assert_eq!(removed, 2);
        assert_eq!(db.days().unwrap(), vec![date(2025, 3, 14)]);
        assert_eq!(db.domain_totals().unwrap().get(&github), Some(&180_000));
        assert_snapshot!(
            String::from_utf8(output).unwrap(),
            @"Removed 2 expired day(s); keeping days from 2025-02-14."
        );
    }

    #[test]
    fn sweep_is_idempotent() {
        let mut db = Database::open_in_memory().unwrap();
        let now = date(2025, 3, 15).and_hms_opt(12, 0, 0).unwrap();
        let mut output = Vec::new();
        assert_eq!(run(&mut output, &mut db, 30, now).unwrap(), 0);
        assert_eq!(run(&mut output, &mut db, 30, now).unwrap(), 0);
    }
}
