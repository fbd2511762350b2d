//! Events flowing into the tracker and the effects flowing out of it.

use serde::{Deserialize, Serialize};

use crate::types::{TabId, WindowId};

/// A raw signal from the host browser or the presentation surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrowserEvent {
    /// A tab became the foreground tab of its window.
    TabActivated {
        tab_id: TabId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window_id: Option<WindowId>,
    },
    /// A tab changed. `url` is present only when the URL itself changed.
    TabUpdated {
        tab_id: TabId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    /// A tab was closed.
    TabRemoved { tab_id: TabId },
    /// OS focus moved to a window, or away from the browser (`None`).
    WindowFocusChanged { window_id: Option<WindowId> },
    /// Pause or resume request from the presentation surface.
    ToggleTracking { paused: bool },
    /// The host process is about to be torn down.
    Suspend,
}

/// Input to [`crate::SessionMachine::apply`].
///
/// Unlike [`BrowserEvent`], any tab queries the transition depends on have
/// already been answered, so applying an event needs no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TabActivated {
        tab_id: TabId,
    },
    TabUrlUpdated {
        tab_id: TabId,
        url: String,
    },
    FocusLost,
    FocusGained {
        /// Active tab of the newly focused window, if it has one.
        active_tab: Option<TabId>,
    },
    Pause,
    Resume {
        /// Active tab of the active window at resume time.
        active_tab: Option<TabId>,
    },
    Suspend,
}

/// Side effect requested by a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Look up the tab's current URL and commit `elapsed_ms` to its domain.
    CloseOut { tab_id: TabId, elapsed_ms: i64 },
    /// Commit `elapsed_ms` to the domain of `url`.
    CommitUrl { url: String, elapsed_ms: i64 },
    /// Persist the pause flag.
    PersistPaused(bool),
}
