//! Storage layer for TimeLens.
//!
//! Persists lifetime totals, per-day totals and the pause flag using
//! `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. Separate instances (even
//! in separate processes) may point at the same file: every increment runs in
//! an immediate transaction and waits on the busy timeout instead of failing.
//!
//! # Schema
//!
//! | Table           | Storage key     | Contents                                  |
//! |-----------------|-----------------|-------------------------------------------|
//! | `domain_totals` | `timeData`      | lifetime milliseconds per domain          |
//! | `daily_totals`  | `dailyData`     | milliseconds per (day, domain)            |
//! | `settings`      | `trackingPaused`| key/value settings                        |
//!
//! Days are stored as TEXT in ISO 8601 date format (`2025-01-15`), so
//! lexicographic order matches chronological order.
//!
//! # Lost updates
//!
//! Totals are never read into memory, modified and written back. Commits use
//! `INSERT ... ON CONFLICT DO UPDATE SET total_ms = total_ms + excluded.total_ms`,
//! an increment evaluated inside SQLite, so concurrent commits cannot
//! overwrite each other.

use std::fmt;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use thiserror::Error;

use tl_core::{Domain, DomainTotals, TimeStore};

const DAY_FORMAT: &str = "%Y-%m-%d";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const PAUSED_SETTING: &str = "trackingPaused";

/// Namespace reported with every change notification.
pub const NAMESPACE: &str = "local";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Elapsed time must not be negative.
    #[error("cannot add negative time ({elapsed_ms} ms) to {domain}")]
    NegativeDuration { domain: String, elapsed_ms: i64 },
    /// A stored domain failed validation.
    #[error("invalid domain stored: {0:?}")]
    InvalidDomain(String),
    /// A stored day key failed to parse.
    #[error("invalid day key stored: {day}")]
    DayParse {
        day: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Logical keys of the persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Lifetime totals per domain.
    TimeData,
    /// Per-day totals per domain.
    DailyData,
    /// The pause flag.
    TrackingPaused,
}

impl StorageKey {
    /// Every persisted key, in notification order.
    pub const ALL: [Self; 3] = [Self::TimeData, Self::DailyData, Self::TrackingPaused];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TimeData => "timeData",
            Self::DailyData => "dailyData",
            Self::TrackingPaused => "trackingPaused",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted after every successful write through a [`Database`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub keys: Vec<StorageKey>,
    pub namespace: &'static str,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
    subscribers: Vec<Sender<StorageChange>>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.conn.path())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self {
            conn,
            subscribers: Vec::new(),
        };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS domain_totals (
                domain TEXT PRIMARY KEY,
                total_ms INTEGER NOT NULL DEFAULT 0 CHECK (total_ms >= 0)
            );

            -- day: ISO 8601 local calendar date (e.g., '2025-01-15')
            CREATE TABLE IF NOT EXISTS daily_totals (
                day TEXT NOT NULL,
                domain TEXT NOT NULL,
                total_ms INTEGER NOT NULL DEFAULT 0 CHECK (total_ms >= 0),
                PRIMARY KEY (day, domain)
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Subscribes to change notifications from this connection.
    ///
    /// Receivers that have been dropped are forgotten on the next write.
    pub fn subscribe(&mut self) -> Receiver<StorageChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, keys: Vec<StorageKey>) {
        if self.subscribers.is_empty() {
            return;
        }
        let change = StorageChange {
            keys,
            namespace: NAMESPACE,
        };
        self.subscribers
            .retain(|subscriber| subscriber.send(change.clone()).is_ok());
    }

    /// Atomically adds `elapsed_ms` to the domain's lifetime total and to its
    /// total for `day`, creating either row if absent.
    pub fn add_time(
        &mut self,
        domain: &Domain,
        day: NaiveDate,
        elapsed_ms: i64,
    ) -> Result<(), DbError> {
        if elapsed_ms < 0 {
            return Err(DbError::NegativeDuration {
                domain: domain.to_string(),
                elapsed_ms,
            });
        }
        let day = format_day(day);
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "
            INSERT INTO domain_totals (domain, total_ms) VALUES (?1, ?2)
            ON CONFLICT(domain) DO UPDATE SET total_ms = total_ms + excluded.total_ms
            ",
            params![domain.as_str(), elapsed_ms],
        )?;
        tx.execute(
            "
            INSERT INTO daily_totals (day, domain, total_ms) VALUES (?1, ?2, ?3)
            ON CONFLICT(day, domain) DO UPDATE SET total_ms = total_ms + excluded.total_ms
            ",
            params![day, domain.as_str(), elapsed_ms],
        )?;
        tx.commit()?;
        self.notify(vec![StorageKey::TimeData, StorageKey::DailyData]);
        Ok(())
    }

    /// Lifetime totals for every domain.
    pub fn domain_totals(&self) -> Result<DomainTotals, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT domain, total_ms FROM domain_totals ORDER BY domain ASC")?;
        let rows = stmt.query_map([], |row| {
            let domain: String = row.get(0)?;
            let total_ms: i64 = row.get(1)?;
            Ok((domain, total_ms))
        })?;
        collect_totals(rows)
    }

    /// Totals for one day; empty when the day has no bucket.
    pub fn daily_totals(&self, day: NaiveDate) -> Result<DomainTotals, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT domain, total_ms
            FROM daily_totals
            WHERE day = ?
            ORDER BY domain ASC
            ",
        )?;
        let rows = stmt.query_map([format_day(day)], |row| {
            let domain: String = row.get(0)?;
            let total_ms: i64 = row.get(1)?;
            Ok((domain, total_ms))
        })?;
        collect_totals(rows)
    }

    /// Days that have a bucket, oldest first.
    pub fn days(&self) -> Result<Vec<NaiveDate>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT day FROM daily_totals ORDER BY day ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut days = Vec::new();
        for row in rows {
            days.push(parse_day(row?)?);
        }
        Ok(days)
    }

    /// Deletes every day bucket strictly before `first_kept`.
    ///
    /// Returns the number of day buckets removed. Lifetime totals are untouched.
    pub fn prune_daily_before(&mut self, first_kept: NaiveDate) -> Result<usize, DbError> {
        let first_kept = format_day(first_kept);
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let days: i64 = tx.query_row(
            "SELECT COUNT(DISTINCT day) FROM daily_totals WHERE day < ?",
            [&first_kept],
            |row| row.get(0),
        )?;
        if days > 0 {
            tx.execute("DELETE FROM daily_totals WHERE day < ?", [&first_kept])?;
        }
        tx.commit()?;

        let removed = usize::try_from(days).unwrap_or_default();
        if removed > 0 {
            self.notify(vec![StorageKey::DailyData]);
        }
        Ok(removed)
    }

    /// The persisted pause flag; `false` when never set.
    pub fn tracking_paused(&self) -> Result<bool, DbError> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                [PAUSED_SETTING],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.as_deref() == Some("true"))
    }

    pub fn set_tracking_paused(&mut self, paused: bool) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO settings (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
            params![PAUSED_SETTING, if paused { "true" } else { "false" }],
        )?;
        self.notify(vec![StorageKey::TrackingPaused]);
        Ok(())
    }

    /// Irreversibly erases every persisted key.
    pub fn clear(&mut self) -> Result<(), DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute_batch(
            "
            DELETE FROM domain_totals;
            DELETE FROM daily_totals;
            DELETE FROM settings;
            ",
        )?;
        tx.commit()?;
        tracing::info!("cleared all tracking data");
        self.notify(StorageKey::ALL.to_vec());
        Ok(())
    }

    /// SQLite's `data_version` for this connection.
    ///
    /// The value changes whenever another connection, in this process or
    /// another one, commits to the file. Commits made through this handle
    /// leave it unchanged; those reach [`subscribe`](Self::subscribe) receivers instead.
    pub fn data_version(&self) -> Result<i64, DbError> {
        let version = self
            .conn
            .query_row("PRAGMA data_version", [], |row| row.get(0))?;
        Ok(version)
    }
}

impl TimeStore for Database {
    type Error = DbError;

    fn add_time(&mut self, domain: &Domain, day: NaiveDate, elapsed_ms: i64) -> Result<(), DbError> {
        Self::add_time(self, domain, day, elapsed_ms)
    }

    fn prune_daily_before(&mut self, first_kept: NaiveDate) -> Result<usize, DbError> {
        Self::prune_daily_before(self, first_kept)
    }

    fn tracking_paused(&self) -> Result<bool, DbError> {
        Self::tracking_paused(self)
    }

    fn set_tracking_paused(&mut self, paused: bool) -> Result<(), DbError> {
        Self::set_tracking_paused(self, paused)
    }
}

fn collect_totals(
    rows: impl Iterator<Item = rusqlite::Result<(String, i64)>>,
) -> Result<DomainTotals, DbError> {
    let mut totals = DomainTotals::new();
    for row in rows {
        let (domain, total_ms) = row?;
        let domain = Domain::new(domain.clone()).map_err(|_| DbError::InvalidDomain(domain))?;
        totals.insert(domain, total_ms);
    }
    Ok(totals)
}

fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

fn parse_day(day: String) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(&day, DAY_FORMAT).map_err(|source| DbError::DayParse { day, source })
}
