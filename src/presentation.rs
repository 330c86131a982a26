use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::alerts::{Alert, AlertCategory, AlertStore};
use crate::events::Event;
use crate::types::{AlertId, Millis, ToastId, View};

/// How long a toast stays on screen.
pub const TOAST_DURATION_MS: u64 = 4_000;

pub const EMPTY_PANEL_TEXT: &str = "No active alerts.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AudioCue {
    Warning,
    Success,
}

impl AudioCue {
    pub fn for_category(category: AlertCategory) -> Self {
        match category {
            AlertCategory::Warning => AudioCue::Warning,
            AlertCategory::Success => AudioCue::Success,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("playback blocked until the user interacts with the page")]
    NotAllowed,
    #[error("audio source unavailable: {0}")]
    Unavailable(String),
}

/// Audio output. Playback is fire-and-forget; callers discard failures.
pub trait AudioSink {
    fn play(&mut self, cue: AudioCue) -> Result<(), PlaybackError>;
}

/// Sink that records what it was asked to play. Used as the session default.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub played: Vec<AudioCue>,
    /// When set, every request fails with this error after being recorded.
    pub fail_with: Option<PlaybackError>,
}

impl AudioSink for RecordingSink {
    fn play(&mut self, cue: AudioCue) -> Result<(), PlaybackError> {
        self.played.push(cue);
        match &self.fail_with {
            Some(PlaybackError::NotAllowed) => Err(PlaybackError::NotAllowed),
            Some(PlaybackError::Unavailable(src)) => Err(PlaybackError::Unavailable(src.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub id: ToastId,
    pub alert_id: AlertId,
    pub category: AlertCategory,
    pub message: String,
    pub shown_at: Millis,
    pub visible_until: Millis,
}

impl Toast {
    pub fn is_visible_at(&self, now: Millis) -> bool {
        self.shown_at <= now && now < self.visible_until
    }
}

/// Transient popups. Independent of the store: expiring a toast never
/// touches the alert list, and clearing the list leaves toasts alone.
#[derive(Debug, Clone)]
pub struct ToastTray {
    /// Most recent first.
    toasts: Vec<Toast>,
    duration_ms: u64,
    next_id: u64,
}

impl Default for ToastTray {
    fn default() -> Self {
        Self::new(TOAST_DURATION_MS)
    }
}

impl ToastTray {
    pub fn new(duration_ms: u64) -> Self {
        ToastTray { toasts: Vec::new(), duration_ms, next_id: 1 }
    }

    /// Show a toast for `alert` and return the expiry event to schedule.
    pub fn push(&mut self, alert: &Alert, now: Millis) -> (Millis, Event) {
        let id = ToastId(self.next_id);
        self.next_id += 1;
        let visible_until = now.offset(self.duration_ms);
        self.toasts.insert(
            0,
            Toast {
                id,
                alert_id: alert.id,
                category: alert.category,
                message: alert.message.clone(),
                shown_at: now,
                visible_until,
            },
        );
        (visible_until, Event::ToastExpired { toast_id: id })
    }

    pub fn expire(&mut self, toast_id: ToastId) {
        self.toasts.retain(|t| t.id != toast_id);
    }

    pub fn clear(&mut self) {
        self.toasts.clear();
    }

    /// Toasts on screen at `now`, most recent first.
    pub fn visible_at(&self, now: Millis) -> Vec<&Toast> {
        self.toasts.iter().filter(|t| t.is_visible_at(now)).collect()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelRow {
    pub alert_id: AlertId,
    pub category: AlertCategory,
    pub message: String,
    pub short_time: String,
}

/// Body of the live alerts panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PanelListing {
    Empty,
    Rows(Vec<PanelRow>),
}

impl fmt::Display for PanelListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelListing::Empty => writeln!(f, "{EMPTY_PANEL_TEXT}"),
            PanelListing::Rows(rows) => {
                for row in rows {
                    let marker = match row.category {
                        AlertCategory::Warning => '!',
                        AlertCategory::Success => '+',
                    };
                    writeln!(f, "{marker} {:<48} {}", row.message, row.short_time)?;
                }
                Ok(())
            }
        }
    }
}

/// Live alerts panel and bell badge. Holds only presentation flags; the alert
/// list and panel visibility live in the store.
#[derive(Debug, Clone)]
pub struct AlertsPanel {
    pub sound_on: bool,
    pub has_new_alert: bool,
}

impl Default for AlertsPanel {
    fn default() -> Self {
        AlertsPanel { sound_on: true, has_new_alert: false }
    }
}

impl AlertsPanel {
    pub fn new(sound_on: bool) -> Self {
        AlertsPanel { sound_on, has_new_alert: false }
    }

    /// React to a freshly stored alert: raise the badge when the panel is
    /// closed and play the category cue if sound is on.
    pub fn on_alert_added(&mut self, alert: &Alert, panel_open: bool, audio: &mut dyn AudioSink) {
        if !panel_open {
            self.has_new_alert = true;
        }
        if self.sound_on {
            let cue = AudioCue::for_category(alert.category);
            if let Err(err) = audio.play(cue) {
                debug!(?cue, %err, "audio cue dropped");
            }
        }
    }

    pub fn open(&mut self, store: &mut AlertStore) {
        store.open_panel();
        self.has_new_alert = false;
    }

    pub fn toggle_sound(&mut self) {
        self.sound_on = !self.sound_on;
    }

    /// Select the clicked alert, close the panel and route to the alerts
    /// page. Unknown ids (already evicted or cleared) do nothing.
    pub fn on_alert_clicked(
        &mut self,
        store: &mut AlertStore,
        alert_id: AlertId,
        now: Millis,
    ) -> Vec<(Millis, Event)> {
        let Some(alert) = store.find(alert_id).cloned() else {
            return vec![];
        };
        store.select_alert(alert);
        store.close_panel();
        vec![(now, Event::Navigate { view: View::Alerts })]
    }

    pub fn on_clear_all(&mut self, store: &mut AlertStore) {
        store.clear_alerts();
    }

    pub fn listing(store: &AlertStore) -> PanelListing {
        if store.is_empty() {
            PanelListing::Empty
        } else {
            PanelListing::Rows(Self::rows(store))
        }
    }

    pub fn rows(store: &AlertStore) -> Vec<PanelRow> {
        store
            .alerts()
            .map(|a| PanelRow {
                alert_id: a.id,
                category: a.category,
                message: a.message.clone(),
                short_time: a.short_time.clone(),
            })
            .collect()
    }
}
