use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alerts::MAX_ALERTS;
use crate::map::LatLng;
use crate::policy::{PayoutTrigger, SimulationParameters};
use crate::presentation::TOAST_DURATION_MS;
use crate::types::View;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub seed: u64,
    /// Wall-clock instant that session time zero maps to.
    pub started_at: DateTime<Utc>,
    pub landing_view: View,
    pub generator_period_ms: u64,
    pub toast_duration_ms: u64,
    pub portfolio_period_ms: u64,
    pub max_alerts: usize,
    pub seed_alerts: bool,
    pub sound_on: bool,
    pub map_center: LatLng,
    pub map_zoom: u8,
    /// `None` keeps every drawn zone.
    pub zone_cap: Option<usize>,
    pub payout_trigger: PayoutTrigger,
    pub policy_defaults: SimulationParameters,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

impl AppConfig {
    pub fn canonical() -> Self {
        AppConfig {
            seed: 42,
            started_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).single().unwrap_or_default(),
            landing_view: View::Dashboard,
            generator_period_ms: 15_000,
            toast_duration_ms: TOAST_DURATION_MS,
            portfolio_period_ms: 5_000,
            max_alerts: MAX_ALERTS,
            seed_alerts: true,
            sound_on: true,
            // Centred on Kenya.
            map_center: LatLng::new(-0.0236, 37.9062),
            map_zoom: 6,
            zone_cap: None,
            payout_trigger: PayoutTrigger::default(),
            policy_defaults: SimulationParameters::default(),
        }
    }

    /// Load overrides from a JSON file. Missing keys keep canonical values.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: display.clone(), source })?;
        let config: AppConfig = serde_json::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: display, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generator_period_ms == 0 {
            return Err(ConfigError::Invalid("generator_period_ms must be positive".into()));
        }
        if self.portfolio_period_ms == 0 {
            return Err(ConfigError::Invalid("portfolio_period_ms must be positive".into()));
        }
        if self.max_alerts == 0 {
            return Err(ConfigError::Invalid("max_alerts must be at least 1".into()));
        }
        if self.zone_cap == Some(0) {
            return Err(ConfigError::Invalid("zone_cap must be at least 1 when set".into()));
        }
        Ok(())
    }
}
