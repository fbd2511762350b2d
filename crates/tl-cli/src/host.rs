//! Native host protocol: message framing and the browser tab mirror.
//!
//! The extension sends one JSON object per line. The registry replays those
//! messages to answer the tab lookups the tracker needs at close-out.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tl_core::{BrowserEvent, Tab, TabId, TabSource, WindowId};
use tl_db::StorageChange;

/// One incoming protocol line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostMessage {
    /// When the event happened; absent means "now".
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub event: BrowserEvent,
}

impl HostMessage {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// One outgoing protocol line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostReply {
    Ack {
        success: bool,
    },
    StorageChanged {
        keys: Vec<&'static str>,
        namespace: &'static str,
    },
}

impl From<StorageChange> for HostReply {
    fn from(change: StorageChange) -> Self {
        Self::StorageChanged {
            keys: change.keys.iter().map(|key| key.as_str()).collect(),
            namespace: change.namespace,
        }
    }
}

impl HostReply {
    /// Serializes the reply as one protocol line, newline included.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Mirror of the browser's tabs, built from the event stream.
#[derive(Debug, Default)]
pub struct TabRegistry {
    tabs: HashMap<TabId, Tab>,
    active_by_window: HashMap<WindowId, TabId>,
    focused_window: Option<WindowId>,
    last_activated: Option<TabId>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one event into the mirror. Call before handing the event to
    /// the tracker so lookups see the browser's current view.
    pub fn observe(&mut self, event: &BrowserEvent) {
        match event {
            BrowserEvent::TabActivated { tab_id, window_id } => {
                let tab = self.tabs.entry(*tab_id).or_insert_with(|| Tab {
                    id: *tab_id,
                    window_id: None,
                    url: None,
                });
                if let Some(window_id) = window_id {
                    tab.window_id = Some(*window_id);
                    self.active_by_window.insert(*window_id, *tab_id);
                    if self.focused_window.is_none() {
                        self.focused_window = Some(*window_id);
                    }
                }
                self.last_activated = Some(*tab_id);
            }
            BrowserEvent::TabUpdated { tab_id, url } => {
                let tab = self.tabs.entry(*tab_id).or_insert_with(|| Tab {
                    id: *tab_id,
                    window_id: None,
                    url: None,
                });
                if let Some(url) = url {
                    tab.url = Some(url.clone());
                }
            }
            BrowserEvent::TabRemoved { tab_id } => {
                self.tabs.remove(tab_id);
                self.active_by_window.retain(|_, active| active != tab_id);
                if self.last_activated == Some(*tab_id) {
                    self.last_activated = None;
                }
            }
            BrowserEvent::WindowFocusChanged { window_id } => {
                if let Some(window_id) = window_id {
                    self.focused_window = Some(*window_id);
                }
            }
            BrowserEvent::ToggleTracking { .. } | BrowserEvent::Suspend => {}
        }
    }

    /// Number of open tabs currently mirrored.
    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }
}

impl TabSource for TabRegistry {
    fn get_tab(&self, tab_id: TabId) -> Option<Tab> {
        self.tabs.get(&tab_id).cloned()
    }

    /// With no window, answers for the last focused window, falling back to
    /// the most recently activated tab.
    fn active_tab(&self, window_id: Option<WindowId>) -> Option<Tab> {
        let tab_id = match window_id.or(self.focused_window) {
            Some(window_id) => self.active_by_window.get(&window_id).copied(),
            None => self.last_activated,
        }?;
        self.get_tab(tab_id)
    }
}
