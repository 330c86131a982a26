use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AlertId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ToastId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ZoneId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TimerId(pub u64);

/// Session time in milliseconds since the session started.
/// Time jumps directly from one event to the next; nothing ticks through the
/// gaps. Timers are expressed as offsets from the instant they are armed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Millis(pub u64);

impl Millis {
    pub const SECOND: u64 = 1_000;

    pub fn from_secs(secs: u64) -> Self {
        Millis(secs * Self::SECOND)
    }

    pub fn offset(self, millis: u64) -> Self {
        Millis(self.0 + millis)
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / Self::SECOND as f64
    }
}

/// Top-level pages reachable through navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    Dashboard,
    Alerts,
    Map,
    Portfolio,
    PolicySimulation,
}

impl View {
    pub fn route(self) -> &'static str {
        match self {
            View::Dashboard => "/dashboard",
            View::Alerts => "/alerts",
            View::Map => "/map",
            View::Portfolio => "/portfolio",
            View::PolicySimulation => "/policy-simulation",
        }
    }
}
