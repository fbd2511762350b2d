//! Session tracker: drives the [`SessionMachine`] against its collaborators.
//!
//! The tracker translates [`BrowserEvent`]s into [`SessionEvent`]s (answering
//! any tab queries first), applies them, and carries out the resulting
//! effects: resolving a closed tab's URL, committing elapsed time to the
//! [`TimeStore`], persisting the pause flag, and sweeping expired day buckets.
//!
//! Nothing here is fatal. Store and lookup failures are logged and the
//! session state still advances, so tracking never gets stuck on one bad
//! event.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::normalize_url;
use crate::event::{BrowserEvent, Effect, SessionEvent};
use crate::retention::{self, DEFAULT_RETENTION_DAYS};
use crate::session::{ActiveSession, DEFAULT_SIGNIFICANCE_THRESHOLD_MS, SessionMachine};
use crate::types::{Domain, TabId, WindowId};

/// Durable storage for accumulated time.
///
/// `add_time` must behave as an atomic increment of both the lifetime total
/// and the day bucket: two commits to the same domain must never lose either
/// increment, however they interleave.
pub trait TimeStore {
    type Error: std::error::Error;

    /// Adds `elapsed_ms` to the domain's lifetime total and to its total for `day`.
    fn add_time(&mut self, domain: &Domain, day: NaiveDate, elapsed_ms: i64)
    -> Result<(), Self::Error>;

    /// Deletes every day bucket strictly before `first_kept`. Returns the
    /// number of day buckets removed.
    fn prune_daily_before(&mut self, first_kept: NaiveDate) -> Result<usize, Self::Error>;

    fn tracking_paused(&self) -> Result<bool, Self::Error>;

    fn set_tracking_paused(&mut self, paused: bool) -> Result<(), Self::Error>;
}

/// A browser tab as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<WindowId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Tab queries answered by the host browser.
///
/// Lookups that fail for any reason (tab closed, permission denied) resolve
/// to `None`.
pub trait TabSource {
    fn get_tab(&self, tab_id: TabId) -> Option<Tab>;

    /// The active tab of `window_id`, or of the current window when `None`.
    fn active_tab(&self, window_id: Option<WindowId>) -> Option<Tab>;
}

/// Tunables for the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Sessions shorter than this are discarded.
    pub significance_threshold_ms: i64,
    /// Days of per-day totals to keep.
    pub retention_days: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            significance_threshold_ms: DEFAULT_SIGNIFICANCE_THRESHOLD_MS,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

/// Time durably added to a domain by one close-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub domain: Domain,
    pub day: NaiveDate,
    pub elapsed_ms: i64,
}

/// Owns the session state and the store it commits to.
pub struct Tracker<S: TimeStore> {
    machine: SessionMachine,
    store: S,
    config: TrackerConfig,
    last_sweep: Option<NaiveDate>,
}

impl<S: TimeStore> fmt::Debug for Tracker<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("state", self.machine.state())
            .field("config", &self.config)
            .field("last_sweep", &self.last_sweep)
            .finish_non_exhaustive()
    }
}

impl<S: TimeStore> Tracker<S> {
    /// Creates a tracker, restoring the persisted pause flag.
    ///
    /// An unreadable flag is logged and treated as "not paused".
    pub fn new(store: S, config: TrackerConfig) -> Self {
        let paused = store.tracking_paused().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to read pause flag, assuming not paused");
            false
        });
        tracing::debug!(paused, "tracker initialized");
        Self {
            machine: SessionMachine::new(paused, config.significance_threshold_ms),
            store,
            config,
            last_sweep: None,
        }
    }

    pub const fn state(&self) -> &ActiveSession {
        self.machine.state()
    }

    pub const fn is_paused(&self) -> bool {
        self.machine.is_paused()
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Handles one host event at `now` and returns the commits it produced.
    pub fn handle<T: TabSource>(
        &mut self,
        event: &BrowserEvent,
        tabs: &T,
        now: DateTime<Utc>,
    ) -> Vec<Commit> {
        let Some(session_event) = self.translate(event, tabs) else {
            return Vec::new();
        };
        tracing::debug!(?session_event, "applying session event");
        let effects = self.machine.apply(session_event, now);
        self.execute(effects, tabs, now)
    }

    /// Runs the retention sweeper at `now`. Returns the number of day
    /// buckets removed; failures are logged and count as zero.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let local_now = now.with_timezone(&chrono::Local).naive_local();
        self.last_sweep = Some(local_now.date());
        match retention::sweep(&mut self.store, local_now, self.config.retention_days) {
            Ok(removed) => removed,
            Err(err) => {
                tracing::warn!(error = %err, "retention sweep failed");
                0
            }
        }
    }

    /// Adopts a pause flag written through another store handle.
    ///
    /// When the stored flag differs from the session state, pauses (closing
    /// out the open session) or resumes on the active tab. The flag is not
    /// written back.
    pub fn reload_paused<T: TabSource>(&mut self, tabs: &T, now: DateTime<Utc>) -> Vec<Commit> {
        let paused = match self.store.tracking_paused() {
            Ok(paused) => paused,
            Err(err) => {
                tracing::warn!(error = %err, "failed to re-read pause flag");
                return Vec::new();
            }
        };
        if paused == self.is_paused() {
            return Vec::new();
        }
        let Some(session_event) = self.translate(&BrowserEvent::ToggleTracking { paused }, tabs)
        else {
            return Vec::new();
        };
        tracing::info!(paused, "pause flag changed by another writer");
        let effects = self
            .machine
            .apply(session_event, now)
            .into_iter()
            .filter(|effect| !matches!(effect, Effect::PersistPaused(_)))
            .collect();
        self.execute(effects, tabs, now)
    }

    fn translate<T: TabSource>(&self, event: &BrowserEvent, tabs: &T) -> Option<SessionEvent> {
        match event {
            BrowserEvent::TabActivated { tab_id, .. } => {
                Some(SessionEvent::TabActivated { tab_id: *tab_id })
            }
            BrowserEvent::TabUpdated {
                tab_id,
                url: Some(url),
            } => Some(SessionEvent::TabUrlUpdated {
                tab_id: *tab_id,
                url: url.clone(),
            }),
            BrowserEvent::TabUpdated { url: None, .. } | BrowserEvent::TabRemoved { .. } => None,
            BrowserEvent::WindowFocusChanged { window_id: None } => Some(SessionEvent::FocusLost),
            BrowserEvent::WindowFocusChanged {
                window_id: Some(window_id),
            } => {
                if self.is_paused() {
                    return None;
                }
                let active_tab = tabs.active_tab(Some(*window_id)).map(|tab| tab.id);
                Some(SessionEvent::FocusGained { active_tab })
            }
            BrowserEvent::ToggleTracking { paused: true } => Some(SessionEvent::Pause),
            BrowserEvent::ToggleTracking { paused: false } => {
                let active_tab = tabs.active_tab(None).map(|tab| tab.id);
                Some(SessionEvent::Resume { active_tab })
            }
            BrowserEvent::Suspend => Some(SessionEvent::Suspend),
        }
    }

    fn execute<T: TabSource>(
        &mut self,
        effects: Vec<Effect>,
        tabs: &T,
        now: DateTime<Utc>,
    ) -> Vec<Commit> {
        let mut commits = Vec::new();
        for effect in effects {
            match effect {
                Effect::CloseOut { tab_id, elapsed_ms } => {
                    let Some(url) = tabs.get_tab(tab_id).and_then(|tab| tab.url) else {
                        tracing::debug!(%tab_id, elapsed_ms, "tab not found at close-out, skipping");
                        continue;
                    };
                    commits.extend(self.commit_url(&url, elapsed_ms, now));
                }
                Effect::CommitUrl { url, elapsed_ms } => {
                    commits.extend(self.commit_url(&url, elapsed_ms, now));
                }
                Effect::PersistPaused(paused) => {
                    if let Err(err) = self.store.set_tracking_paused(paused) {
                        tracing::warn!(error = %err, paused, "failed to persist pause flag");
                    }
                }
            }
        }
        commits
    }

    fn commit_url(&mut self, url: &str, elapsed_ms: i64, now: DateTime<Utc>) -> Option<Commit> {
        let Some(domain) = normalize_url(url) else {
            tracing::debug!(url, elapsed_ms, "no trackable domain, skipping commit");
            return None;
        };

        let day = retention::local_day(now);
        if let Err(err) = self.store.add_time(&domain, day, elapsed_ms) {
            tracing::warn!(error = %err, %domain, elapsed_ms, "failed to commit tracked time");
            return None;
        }
        tracing::debug!(%domain, %day, elapsed_ms, "committed tracked time");

        if self.last_sweep != Some(day) {
            self.sweep(now);
        }

        Some(Commit {
            domain,
            day,
            elapsed_ms,
        })
    }
}
