//! The native host loop behind `tl run`.
//!
//! Reads one JSON message per line, feeds it through the tab registry and
//! the tracker, and writes acks and storage change notifications back.
//! Commits made by other processes (`tl clear`, `tl pause`) are picked up by
//! polling the database version.

use std::sync::mpsc::Receiver;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tl_core::{BrowserEvent, Tracker};
use tl_db::{Database, NAMESPACE, StorageChange, StorageKey};

use crate::Config;
use crate::host::{HostMessage, HostReply, TabRegistry};

const SECONDS_PER_HOUR: u64 = 60 * 60;

/// How often the loop checks for commits from other connections.
const EXTERNAL_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Counters reported when the loop exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Messages parsed and handled.
    pub events: usize,
    /// Lines that were not valid messages.
    pub skipped: usize,
    /// Domain commits written.
    pub commits: usize,
    /// Scheduled sweeps run.
    pub sweeps: usize,
    /// Commits by other connections that were announced.
    pub external_changes: usize,
}

/// Periods of the loop's timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Time between scheduled retention sweeps.
    pub sweep_every: Duration,
    /// Time between database version checks.
    pub poll_every: Duration,
}

impl Schedule {
    pub fn from_config(config: &Config) -> Self {
        let hours = config.sweep_interval_hours.max(1);
        Self {
            sweep_every: Duration::from_secs(hours.saturating_mul(SECONDS_PER_HOUR)),
            poll_every: EXTERNAL_POLL_INTERVAL,
        }
    }
}

/// Runs the host loop on stdin/stdout until EOF or Ctrl-C.
pub fn run(db: Database, config: &Config) -> Result<RunStats> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let result = runtime.block_on(run_host(
        db,
        config,
        Schedule::from_config(config),
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    ));
    // A pending stdin read cannot be cancelled; don't wait for it.
    runtime.shutdown_background();
    result
}

/// A timer whose first tick is one full period from now.
fn delayed_interval(period: Duration) -> Result<Interval> {
    let start = Instant::now()
        .checked_add(period)
        .context("timer period out of range")?;
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Ok(interval)
}

/// Host loop over arbitrary line input and output.
///
/// On EOF or Ctrl-C the open session is closed out with a `suspend`, stamped
/// with the last explicit message timestamp if there was one.
pub async fn run_host<R, W>(
    mut db: Database,
    config: &Config,
    schedule: Schedule,
    input: R,
    mut output: W,
) -> Result<RunStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let changes = db.subscribe();
    let mut data_version = db
        .data_version()
        .context("failed to read database version")?;
    let mut tracker = Tracker::new(db, config.tracker);
    let mut registry = TabRegistry::new();
    let mut stats = RunStats::default();
    let mut last_timestamp: Option<DateTime<Utc>> = None;

    let mut sweep = delayed_interval(schedule.sweep_every)?;
    let mut poll = delayed_interval(schedule.poll_every)?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut lines = input.lines();
    tracing::info!(paused = tracker.is_paused(), "host loop started");

    loop {
        tokio::select! {
            // Ctrl-C first: its handler is only installed once polled.
            biased;

            result = &mut shutdown => {
                result.context("failed to listen for Ctrl-C")?;
                tracing::info!("interrupted");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read host message")? else {
                    tracing::debug!("host input closed");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let message = match HostMessage::parse(line) {
                    Ok(message) => message,
                    Err(err) => {
                        tracing::warn!(error = %err, line, "skipping malformed host message");
                        stats.skipped += 1;
                        continue;
                    }
                };
                if message.timestamp.is_some() {
                    last_timestamp = message.timestamp;
                }
                let now = message.timestamp.unwrap_or_else(Utc::now);

                registry.observe(&message.event);
                let commits = tracker.handle(&message.event, &registry, now);
                stats.events += 1;
                stats.commits += commits.len();

                forward_changes(&changes, &mut output).await?;
                if matches!(message.event, BrowserEvent::ToggleTracking { .. }) {
                    write_reply(&mut output, &HostReply::Ack { success: true }).await?;
                }
            }
            _ = sweep.tick() => {
                let removed = tracker.sweep(Utc::now());
                tracing::debug!(removed, "scheduled sweep finished");
                stats.sweeps += 1;
                forward_changes(&changes, &mut output).await?;
            }
            _ = poll.tick() => {
                match tracker.store().data_version() {
                    Ok(version) if version != data_version => {
                        data_version = version;
                        stats.external_changes += 1;
                        tracing::debug!(version, "database changed by another connection");
                        let change = StorageChange {
                            keys: StorageKey::ALL.to_vec(),
                            namespace: NAMESPACE,
                        };
                        write_reply(&mut output, &HostReply::from(change)).await?;
                        stats.commits += tracker.reload_paused(&registry, Utc::now()).len();
                        forward_changes(&changes, &mut output).await?;
                    }
                    Ok(_) => {}
                    Err(err) => tracing::warn!(error = %err, "failed to poll database version"),
                }
            }
        }
        output.flush().await.context("failed to flush host output")?;
    }

    let now = last_timestamp.unwrap_or_else(Utc::now);
    stats.commits += tracker.handle(&BrowserEvent::Suspend, &registry, now).len();
    forward_changes(&changes, &mut output).await?;
    output.flush().await.context("failed to flush host output")?;

    tracing::info!(
        events = stats.events,
        skipped = stats.skipped,
        commits = stats.commits,
        external_changes = stats.external_changes,
        tabs = registry.tab_count(),
        "host loop stopped"
    );
    Ok(stats)
}

async fn forward_changes<W: AsyncWrite + Unpin>(
    changes: &Receiver<StorageChange>,
    output: &mut W,
) -> Result<()> {
    while let Ok(change) = changes.try_recv() {
        write_reply(output, &HostReply::from(change)).await?;
    }
    Ok(())
}

async fn write_reply<W: AsyncWrite + Unpin>(output: &mut W, reply: &HostReply) -> Result<()> {
    let line = reply.to_line().context("failed to encode host reply")?;
    output
        .write_all(line.as_bytes())
        .await
        .context("failed to write host reply")
}
