//! Shared utilities for CLI commands.

use chrono::{DateTime, SecondsFormat, Utc};

/// Formats milliseconds as "Xh Ym" if >= 1 hour, "Xm" otherwise.
///
/// Minutes are floored. Negative durations render as "0m".
pub fn format_duration(ms: i64) -> String {
    let (hours, minutes) = split_minutes(ms);
    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Compact variant of [`format_duration`]: whole hours drop the "0m".
pub fn format_duration_short(ms: i64) -> String {
    let (hours, minutes) = split_minutes(ms);
    match (hours, minutes) {
        (0, minutes) => format!("{minutes}m"),
        (hours, 0) => format!("{hours}h"),
        (hours, minutes) => format!("{hours}h {minutes}m"),
    }
}

fn split_minutes(ms: i64) -> (i64, i64) {
    let total_minutes = ms.max(0) / 60_000;
    (total_minutes / 60, total_minutes % 60)
}

/// IANA name of the local timezone, falling back to UTC.
pub fn local_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// RFC 3339 timestamp with millisecond precision and a `Z` suffix.
pub fn format_generated_at(generated_at: DateTime<Utc>) -> String {
    generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_hours() {
        assert_eq!(format_duration(0), "0m");
        assert_eq!(format_duration(59_999), "0m");
        assert_eq!(format_duration(120_000), "2m");
        assert_eq!(format_duration(3_600_000), "1h 0m");
        assert_eq!(format_duration(3_900_000), "1h 5m");
        assert_eq!(format_duration(-5_000), "0m");
    }

    #[test]
    fn short_format_drops_zero_minutes() {
        assert_eq!(format_duration_short(45 * 60_000), "45m");
        assert_eq!(format_duration_short(2 * 3_600_000), "2h");
        assert_eq!(format_duration_short(2 * 3_600_000 + 60_000), "2h 1m");
    }

    #[test]
    fn generated_at_uses_millisecond_utc() {
        let at = DateTime::parse_from_rfc3339("2025-03-15T10:00:00+02:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_generated_at(at), "2025-03-15T08:00:00.000Z");
    }
}
