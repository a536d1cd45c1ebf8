//! Observable UI state.

use serde::Serialize;
use tokio::sync::{broadcast, watch};

const TRANSITION_BUFFER: usize = 32;

/// What the display should show right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WeatherUi {
    Loading,
    Error { message: String },
    Content(WeatherContent),
}

impl WeatherUi {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Display-ready weather values. Unknown values hold the `"—"` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeatherContent {
    pub location_label: String,
    pub temperature_c: String,
    pub humidity_pct: String,
    pub wind_speed: String,
    pub wind_deg: i32,
    pub wind_dir_text: String,
    pub cloud_cover_pct: String,
    pub precip_mm: String,
    pub observed_at: String,
}

/// Single-writer state cell.
///
/// New watchers see the current value immediately; transition subscribers
/// see every state set after they subscribed, in order, including ones that
/// were replaced right away.
#[derive(Debug)]
pub struct StateCell {
    current: watch::Sender<WeatherUi>,
    transitions: broadcast::Sender<WeatherUi>,
}

impl StateCell {
    pub fn new() -> Self {
        let (current, _) = watch::channel(WeatherUi::Loading);
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        Self {
            current,
            transitions,
        }
    }

    pub(crate) fn set(&self, state: WeatherUi) {
        // No transition subscribers is fine.
        let _ = self.transitions.send(state.clone());
        self.current.send_replace(state);
    }

    pub fn current(&self) -> WeatherUi {
        self.current.borrow().clone()
    }

    /// Latest-value view; replays the current state on subscribe.
    pub fn watch(&self) -> watch::Receiver<WeatherUi> {
        self.current.subscribe()
    }

    /// Every transition from now on.
    pub fn transitions(&self) -> broadcast::Receiver<WeatherUi> {
        self.transitions.subscribe()
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
