//! Retention window for per-day totals.
//!
//! A day bucket is expired once its midnight lies strictly before
//! `now - retention_days`. Lifetime totals are never affected.

use chrono::{DateTime, Days, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::tracker::TimeStore;

/// Default number of days of per-day totals to keep.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// The local calendar day an instant falls on.
pub fn local_day(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Local).date_naive()
}

/// The earliest day bucket that survives a sweep at local time `now`.
///
/// A window reaching past the start of the calendar keeps every day.
pub fn first_retained_day(now: NaiveDateTime, retention_days: u32) -> NaiveDate {
    let Some(cutoff) = now.checked_sub_days(Days::new(u64::from(retention_days))) else {
        return NaiveDate::MIN;
    };
    if cutoff.time() == NaiveTime::MIN {
        cutoff.date()
    } else {
        cutoff.date().succ_opt().unwrap_or(NaiveDate::MAX)
    }
}

/// Whether `day` falls outside the retention window at local time `now`.
pub fn is_expired(day: NaiveDate, now: NaiveDateTime, retention_days: u32) -> bool {
    day < first_retained_day(now, retention_days)
}

/// Removes every expired day bucket from `store`.
///
/// Idempotent: with nothing to prune it removes nothing and returns 0.
pub fn sweep<S: TimeStore>(
    store: &mut S,
    now: NaiveDateTime,
    retention_days: u32,
) -> Result<usize, S::Error> {
    let first_kept = first_retained_day(now, retention_days);
    let removed = store.prune_daily_before(first_kept)?;
    if removed > 0 {
        tracing::info!(removed, %first_kept, "pruned expired daily totals");
    }
    Ok(removed)
}
