use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::AlertId;

/// Upper bound on retained alerts; older ones are evicted on insert.
pub const MAX_ALERTS: usize = 5;

pub const DEFAULT_REGION: &str = "Unknown Region";
pub const DEFAULT_DETAILS: &str =
    "Additional details will be provided as more information becomes available.";
pub const DEFAULT_RECOMMENDATIONS: [&str; 2] =
    ["Monitor the situation closely", "Follow standard agricultural practices"];
pub const DEFAULT_AFFECTED_AREAS: [&str; 1] = ["Multiple areas"];
pub const DEFAULT_SHORT_TIME: &str = "moments ago";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Warning,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Severity assumed when a new alert does not state one.
    pub fn for_category(category: AlertCategory) -> Self {
        match category {
            AlertCategory::Warning => Severity::High,
            AlertCategory::Success => Severity::Low,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub id: AlertId,
    pub category: AlertCategory,
    pub message: String,
    pub short_time: String,
    pub region: String,
    pub severity: Severity,
    pub details: String,
    pub recommendations: Vec<String>,
    pub affected_areas: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A partially specified alert. Everything except category and message is
/// optional and filled with defaults by [`AlertStore::add_alert`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlertDraft {
    pub category: Option<AlertCategory>,
    pub message: String,
    pub short_time: Option<String>,
    pub region: Option<String>,
    pub severity: Option<Severity>,
    pub details: Option<String>,
    pub recommendations: Option<Vec<String>>,
    pub affected_areas: Option<Vec<String>>,
}

impl AlertDraft {
    pub fn new(category: AlertCategory, message: impl Into<String>) -> Self {
        AlertDraft { category: Some(category), message: message.into(), ..Default::default() }
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn short_time(mut self, short_time: impl Into<String>) -> Self {
        self.short_time = Some(short_time.into());
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn recommendations<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recommendations = Some(items.into_iter().map(Into::into).collect());
        self
    }

    pub fn affected_areas<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_areas = Some(items.into_iter().map(Into::into).collect());
        self
    }

    /// Complete the draft. A draft with no category is treated as a warning.
    fn complete(self, id: AlertId, now: DateTime<Utc>) -> Alert {
        let category = self.category.unwrap_or(AlertCategory::Warning);
        Alert {
            id,
            category,
            message: self.message,
            short_time: self.short_time.unwrap_or_else(|| DEFAULT_SHORT_TIME.to_string()),
            region: self.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            severity: self.severity.unwrap_or_else(|| Severity::for_category(category)),
            details: self.details.unwrap_or_else(|| DEFAULT_DETAILS.to_string()),
            recommendations: self.recommendations.unwrap_or_else(|| {
                DEFAULT_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect()
            }),
            affected_areas: self.affected_areas.unwrap_or_else(|| {
                DEFAULT_AFFECTED_AREAS.iter().map(|s| s.to_string()).collect()
            }),
            created_at: now,
        }
    }
}

/// Shared notification state: the recent alerts, the panel flag and the
/// alert currently chosen for the detail view.
///
/// Every mutation is total. The store is owned by the session and handed to
/// views by reference.
#[derive(Debug, Clone)]
pub struct AlertStore {
    /// Newest first.
    alerts: VecDeque<Alert>,
    capacity: usize,
    panel_open: bool,
    selected: Option<Alert>,
    next_id: u64,
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_ALERTS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        AlertStore {
            alerts: VecDeque::with_capacity(capacity + 1),
            capacity,
            panel_open: false,
            selected: None,
            next_id: 1,
        }
    }

    /// A store holding the two alerts the feed starts with.
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let mut store = Self::new();
        store.seed(now);
        store
    }

    /// Add the two starting alerts, oldest first so the drought alert ends
    /// up on top.
    pub fn seed(&mut self, now: DateTime<Utc>) {
        self.add_alert(
            AlertDraft::new(AlertCategory::Success, "Rainfall improving in Kisumu (+25 mm)")
                .short_time("3 min ago")
                .region("Kisumu County")
                .details(
                    "Positive rainfall trends observed in Kisumu region. Cumulative rainfall \
                     over the past 7 days reached 25mm, bringing soil moisture levels back to \
                     optimal range. NDVI readings show improvement in vegetation health with \
                     index rising to 0.65.",
                )
                .recommendations([
                    "Resume normal farming activities",
                    "Prepare for planting season",
                    "Monitor for potential waterlogging in low-lying areas",
                    "Apply fertilizers as soil moisture is adequate",
                ])
                .affected_areas(["Kisumu Central", "Nyando", "Muhoroni"]),
            now,
        );
        self.add_alert(
            AlertDraft::new(
                AlertCategory::Warning,
                "Drought stress increasing in Makueni (82% risk)",
            )
            .short_time("Just now")
            .region("Makueni County")
            .details(
                "Prolonged drought conditions detected in Makueni region. Soil moisture \
                 levels have dropped to 15%, significantly below the critical threshold of \
                 30%. NDVI readings show vegetation stress index at 0.28, indicating severe \
                 crop stress. Immediate irrigation recommended for vulnerable crops.",
            )
            .recommendations([
                "Implement emergency irrigation for high-value crops",
                "Consider drought-resistant crop varieties for next season",
                "Monitor livestock water sources daily",
                "Apply mulching to conserve soil moisture",
            ])
            .affected_areas(["Kibwezi", "Makindu", "Wote"]),
            now,
        );
    }

    /// Fill defaults, prepend, and evict anything beyond capacity.
    /// Returns a copy of the stored alert.
    pub fn add_alert(&mut self, draft: AlertDraft, now: DateTime<Utc>) -> Alert {
        let id = AlertId(self.next_id);
        self.next_id += 1;
        let alert = draft.complete(id, now);
        self.alerts.push_front(alert.clone());
        self.alerts.truncate(self.capacity);
        alert
    }

    pub fn clear_alerts(&mut self) {
        self.alerts.clear();
    }

    pub fn open_panel(&mut self) {
        self.panel_open = true;
    }

    pub fn close_panel(&mut self) {
        self.panel_open = false;
    }

    pub fn toggle_panel(&mut self) {
        self.panel_open = !self.panel_open;
    }

    /// Select an alert for the detail view. The list is left untouched.
    pub fn select_alert(&mut self, alert: Alert) {
        self.selected = Some(alert);
    }

    /// Reset the selection. The alert views never call this.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn alerts(&self) -> impl ExactSizeIterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn find(&self, id: AlertId) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn is_panel_open(&self) -> bool {
        self.panel_open
    }

    pub fn selected(&self) -> Option<&Alert> {
        self.selected.as_ref()
    }
}
