use std::cmp::Ordering;

use serde::Serialize;

use crate::alerts::AlertCategory;
use crate::map::{DrawnShape, Overlay};
use crate::policy::WeatherScenario;
use crate::types::{AlertId, Millis, TimerId, ToastId, View};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Event {
    /// Fires once at Millis(0). Mounts the shell and the landing view.
    SessionStart { landing: View },
    /// Tears down the active page and the shell; every timer is cancelled.
    SessionEnd,
    /// Switch the active page: the current one is unmounted first.
    Navigate { view: View },
    /// Periodic live-feed timer owned by the shell.
    GeneratorTick { timer_id: TimerId },
    /// A new alert enters the store. Fans out to toast, panel badge and audio.
    AlertRaised { category: AlertCategory, message: String },
    ToastExpired { toast_id: ToastId },
    OpenPanel,
    ClosePanel,
    TogglePanel,
    ToggleSound,
    /// User picked an alert row in the panel.
    AlertClicked { alert_id: AlertId },
    ClearAlerts,
    /// Draw-completion callback from the map.
    ShapeCompleted { shape: DrawnShape },
    OverlaySelected { overlay: Overlay },
    OpacityChanged { opacity: f64 },
    /// Periodic credit-score drift, armed while the portfolio page is mounted.
    PortfolioTick { timer_id: TimerId },
    ScenarioSelected { scenario: WeatherScenario },
    RunSimulation,
    ResetSimulation,
}

/// Log entry and queue entry in one. Ordering is by time, then by the order
/// events were scheduled, so same-instant events dispatch first-in first-out.
/// Equality follows the same key; `seq` is unique within a session.
#[derive(Debug, Clone, Serialize)]
pub struct SimEvent {
    pub at: Millis,
    #[serde(skip)]
    pub seq: u64,
    pub event: Event,
}

impl PartialEq for SimEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for SimEvent {}

impl Ord for SimEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for SimEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub type EventLog = Vec<SimEvent>;
