//! The active-tab session state machine.
//!
//! [`SessionMachine::apply`] is a pure transition function: it takes one
//! [`SessionEvent`] and the current instant, updates the [`ActiveSession`],
//! and returns the [`Effect`]s the caller must carry out. It performs no I/O,
//! so every transition can be exercised with synthetic events.
//!
//! # States
//!
//! - **Idle**: nothing is tracked (paused, browser unfocused, or no tab yet).
//! - **Tracking**: one tab accrues time since `started_at`.
//!
//! The tab's domain is resolved when the session is closed, not when it is
//! opened, so a tab that has no URL yet can still be tracked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{Effect, SessionEvent};
use crate::types::TabId;

/// Default minimum session length, in milliseconds, worth committing.
pub const DEFAULT_SIGNIFICANCE_THRESHOLD_MS: i64 = 1_000;

/// A tab that is currently accruing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSession {
    pub tab_id: TabId,
    pub started_at: DateTime<Utc>,
}

impl OpenSession {
    /// Milliseconds elapsed since the session started.
    ///
    /// Negative when the clock moved backwards.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_milliseconds()
    }
}

/// Process-local tracking state.
///
/// The tab ID and start instant live together in [`OpenSession`], so one can
/// never be present without the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSession {
    pub open: Option<OpenSession>,
    pub paused: bool,
}

impl ActiveSession {
    /// State at startup, given the persisted pause flag.
    pub const fn new(paused: bool) -> Self {
        Self { open: None, paused }
    }

    pub const fn is_tracking(&self) -> bool {
        self.open.is_some()
    }

    pub fn tracked_tab(&self) -> Option<TabId> {
        self.open.map(|session| session.tab_id)
    }
}

/// Transition function over [`ActiveSession`].
#[derive(Debug, Clone)]
pub struct SessionMachine {
    state: ActiveSession,
    threshold_ms: i64,
}

impl SessionMachine {
    pub const fn new(paused: bool, threshold_ms: i64) -> Self {
        Self {
            state: ActiveSession::new(paused),
            threshold_ms,
        }
    }

    pub const fn state(&self) -> &ActiveSession {
        &self.state
    }

    pub const fn is_paused(&self) -> bool {
        self.state.paused
    }

    /// Applies one event at `now` and returns the effects to execute, in order.
    pub fn apply(&mut self, event: SessionEvent, now: DateTime<Utc>) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            SessionEvent::Pause => {
                self.close(now, &mut effects);
                self.state.paused = true;
                effects.push(Effect::PersistPaused(true));
            }
            SessionEvent::Resume { active_tab } => {
                self.state.paused = false;
                effects.push(Effect::PersistPaused(false));
                self.close(now, &mut effects);
                self.open(active_tab, now);
            }
            _ if self.state.paused => {
                tracing::debug!(?event, "tracking paused, ignoring event");
            }
            SessionEvent::TabActivated { tab_id } => {
                self.close(now, &mut effects);
                self.open(Some(tab_id), now);
            }
            SessionEvent::TabUrlUpdated { tab_id, url } => {
                let Some(session) = self.state.open.filter(|s| s.tab_id == tab_id) else {
                    return effects;
                };
                // The previous URL is not known here, so the interval is
                // attributed to the URL the tab navigated to.
                let elapsed_ms = session.elapsed_ms(now);
                if self.is_significant(elapsed_ms) {
                    effects.push(Effect::CommitUrl { url, elapsed_ms });
                }
                self.open(Some(tab_id), now);
            }
            SessionEvent::FocusLost => {
                self.close(now, &mut effects);
            }
            SessionEvent::FocusGained { active_tab } => {
                self.close(now, &mut effects);
                self.open(active_tab, now);
            }
            SessionEvent::Suspend => {
                self.close(now, &mut effects);
            }
        }

        effects
    }

    const fn is_significant(&self, elapsed_ms: i64) -> bool {
        elapsed_ms >= self.threshold_ms
    }

    /// Ends the open session, if any, queueing a close-out when it was long
    /// enough to count.
    fn close(&mut self, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        let Some(session) = self.state.open.take() else {
            return;
        };
        let elapsed_ms = session.elapsed_ms(now);
        if self.is_significant(elapsed_ms) {
            effects.push(Effect::CloseOut {
                tab_id: session.tab_id,
                elapsed_ms,
            });
        } else {
            tracing::debug!(
                tab_id = %session.tab_id,
                elapsed_ms,
                "session below significance threshold, discarded"
            );
        }
    }

    fn open(&mut self, tab_id: Option<TabId>, now: DateTime<Utc>) {
        self.state.open = tab_id.map(|tab_id| OpenSession {
            tab_id,
            started_at: now,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    fn at_ms(ms: i64) -> DateTime<Utc> {
        t0() + Duration::milliseconds(ms)
    }

    fn machine() -> SessionMachine {
        SessionMachine::new(false, DEFAULT_SIGNIFICANCE_THRESHOLD_MS)
    }

    fn activate(tab: i64) -> SessionEvent {
        SessionEvent::TabActivated { tab_id: TabId(tab) }
    }

    #[test]
    fn first_activation_opens_a_session_without_effects() {
        let mut m = machine();
        let effects = m.apply(activate(1), t0());
        assert!(effects.is_empty());
        assert_eq!(
            m.state().open,
            Some(OpenSession {
                tab_id: TabId(1),
                started_at: t0()
            })
        );
    }

    #[test]
    fn tab_switch_closes_out_previous_tab() {
        let mut m = machine();
        m.apply(activate(1), t0());
        let effects = m.apply(activate(2), at_ms(5_000));
        assert_eq!(
            effects,
            vec![Effect::CloseOut {
                tab_id: TabId(1),
                elapsed_ms: 5_000
            }]
        );
        assert_eq!(m.state().tracked_tab(), Some(TabId(2)));
        assert_eq!(m.state().open.unwrap().started_at, at_ms(5_000));
    }

    #[test]
    fn short_sessions_are_discarded() {
        let mut m = machine();
        m.apply(activate(1), t0());
        let effects = m.apply(activate(2), at_ms(500));
        assert!(effects.is_empty());
        assert_eq!(m.state().tracked_tab(), Some(TabId(2)));
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut m = machine();
        m.apply(activate(1), t0());
        let effects = m.apply(activate(2), at_ms(1_000));
        assert_eq!(effects.len(), 1);

        let effects = m.apply(activate(3), at_ms(1_999));
        assert!(effects.is_empty());
    }

    #[test]
    fn backwards_clock_commits_nothing() {
        let mut m = machine();
        m.apply(activate(1), t0());
        let effects = m.apply(activate(2), at_ms(-60_000));
        assert!(effects.is_empty());
    }

    #[test]
    fn url_update_on_tracked_tab_commits_to_new_url_and_restarts() {
        let mut m = machine();
        m.apply(activate(1), t0());
        let effects = m.apply(
            SessionEvent::TabUrlUpdated {
                tab_id: TabId(1),
                url: "https://github.com/".to_string(),
            },
            at_ms(3_000),
        );
        assert_eq!(
            effects,
            vec![Effect::CommitUrl {
                url: "https://github.com/".to_string(),
                elapsed_ms: 3_000
            }]
        );
        assert_eq!(m.state().tracked_tab(), Some(TabId(1)));
        assert_eq!(m.state().open.unwrap().started_at, at_ms(3_000));
    }

    #[test]
    fn url_update_on_other_tab_is_ignored() {
        let mut m = machine();
        m.apply(activate(1), t0());
        let effects = m.apply(
            SessionEvent::TabUrlUpdated {
                tab_id: TabId(2),
                url: "https://reddit.com/".to_string(),
            },
            at_ms(3_000),
        );
        assert!(effects.is_empty());
        assert_eq!(m.state().open.unwrap().started_at, t0());
    }

    #[test]
    fn short_url_update_restarts_without_commit() {
        let mut m = machine();
        m.apply(activate(1), t0());
        let effects = m.apply(
            SessionEvent::TabUrlUpdated {
                tab_id: TabId(1),
                url: "https://github.com/".to_string(),
            },
            at_ms(200),
        );
        assert!(effects.is_empty());
        assert_eq!(m.state().open.unwrap().started_at, at_ms(200));
    }

    #[test]
    fn focus_lost_closes_out_and_goes_idle() {
        let mut m = machine();
        m.apply(activate(1), t0());
        let effects = m.apply(SessionEvent::FocusLost, at_ms(4_000));
        assert_eq!(
            effects,
            vec![Effect::CloseOut {
                tab_id: TabId(1),
                elapsed_ms: 4_000
            }]
        );
        assert!(!m.state().is_tracking());
    }

    #[test]
    fn focus_gained_tracks_active_tab() {
        let mut m = machine();
        m.apply(SessionEvent::FocusLost, t0());
        let effects = m.apply(
            SessionEvent::FocusGained {
                active_tab: Some(TabId(7)),
            },
            at_ms(10_000),
        );
        assert!(effects.is_empty());
        assert_eq!(m.state().tracked_tab(), Some(TabId(7)));
    }

    #[test]
    fn focus_gained_without_active_tab_stays_idle() {
        let mut m = machine();
        m.apply(SessionEvent::FocusGained { active_tab: None }, t0());
        assert!(!m.state().is_tracking());
    }

    #[test]
    fn window_to_window_focus_closes_out_previous_window() {
        let mut m = machine();
        m.apply(activate(1), t0());
        let effects = m.apply(
            SessionEvent::FocusGained {
                active_tab: Some(TabId(2)),
            },
            at_ms(2_500),
        );
        assert_eq!(
            effects,
            vec![Effect::CloseOut {
                tab_id: TabId(1),
                elapsed_ms: 2_500
            }]
        );
        assert_eq!(m.state().tracked_tab(), Some(TabId(2)));
    }

    #[test]
    fn pause_commits_in_progress_session_and_ignores_events() {
        let mut m = machine();
        m.apply(activate(1), t0());
        let effects = m.apply(SessionEvent::Pause, at_ms(6_000));
        assert_eq!(
            effects,
            vec![
                Effect::CloseOut {
                    tab_id: TabId(1),
                    elapsed_ms: 6_000
                },
                Effect::PersistPaused(true),
            ]
        );
        assert!(m.is_paused());
        assert!(!m.state().is_tracking());

        assert!(m.apply(activate(2), at_ms(7_000)).is_empty());
        assert!(m.apply(SessionEvent::FocusLost, at_ms(8_000)).is_empty());
        assert!(
            m.apply(
                SessionEvent::FocusGained {
                    active_tab: Some(TabId(3))
                },
                at_ms(9_000)
            )
            .is_empty()
        );
        assert!(m.apply(SessionEvent::Suspend, at_ms(9_500)).is_empty());
        assert!(!m.state().is_tracking());
    }

    #[test]
    fn resume_starts_fresh_session_on_active_tab() {
        let mut m = SessionMachine::new(true, DEFAULT_SIGNIFICANCE_THRESHOLD_MS);
        let effects = m.apply(
            SessionEvent::Resume {
                active_tab: Some(TabId(4)),
            },
            at_ms(20_000),
        );
        assert_eq!(effects, vec![Effect::PersistPaused(false)]);
        assert!(!m.is_paused());
        assert_eq!(
            m.state().open,
            Some(OpenSession {
                tab_id: TabId(4),
                started_at: at_ms(20_000)
            })
        );
    }

    #[test]
    fn resume_without_active_tab_stays_idle() {
        let mut m = SessionMachine::new(true, DEFAULT_SIGNIFICANCE_THRESHOLD_MS);
        m.apply(SessionEvent::Resume { active_tab: None }, t0());
        assert!(!m.is_paused());
        assert!(!m.state().is_tracking());
    }

    #[test]
    fn suspend_closes_out_when_tracking() {
        let mut m = machine();
        m.apply(activate(1), t0());
        let effects = m.apply(SessionEvent::Suspend, at_ms(30_000));
        assert_eq!(
            effects,
            vec![Effect::CloseOut {
                tab_id: TabId(1),
                elapsed_ms: 30_000
            }]
        );
    }

    #[test]
    fn custom_threshold_is_respected() {
        let mut m = SessionMachine::new(false, 5_000);
        m.apply(activate(1), t0());
        assert!(m.apply(activate(2), at_ms(4_999)).is_empty());
        assert_eq!(m.apply(activate(3), at_ms(10_000)).len(), 1);
    }
}
