use std::fmt;

use serde::Serialize;

use crate::alerts::{Alert, AlertCategory, AlertStore, Severity};
use crate::types::AlertId;

pub const EMPTY_STATE_TEXT: &str = "No alerts yet. New alerts will appear here as they arrive.";

const TIMESTAMP_FORMAT: &str = "%d %b %Y, %H:%M:%S UTC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub alert_id: AlertId,
    pub category: AlertCategory,
    pub severity: Severity,
    pub message: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertDetail {
    pub alert_id: AlertId,
    pub message: String,
    pub severity_badge: String,
    pub region: String,
    pub details: String,
    pub affected_areas: Vec<String>,
    /// Already numbered from 1.
    pub recommendations: Vec<String>,
    pub created_at: String,
}

impl AlertDetail {
    fn from_alert(alert: &Alert) -> Self {
        AlertDetail {
            alert_id: alert.id,
            message: alert.message.clone(),
            severity_badge: format!("{} Severity", alert.severity.label()),
            region: alert.region.clone(),
            details: alert.details.clone(),
            affected_areas: alert.affected_areas.clone(),
            recommendations: alert
                .recommendations
                .iter()
                .enumerate()
                .map(|(i, r)| format!("{}. {r}", i + 1))
                .collect(),
            created_at: alert.created_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// What the alerts page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AlertDetailView {
    Empty,
    Summary(Vec<SummaryRow>),
    Detail(AlertDetail),
}

impl AlertDetailView {
    pub fn render(store: &AlertStore) -> Self {
        if let Some(alert) = store.selected() {
            return AlertDetailView::Detail(AlertDetail::from_alert(alert));
        }
        if store.is_empty() {
            return AlertDetailView::Empty;
        }
        AlertDetailView::Summary(
            store
                .alerts()
                .map(|a| SummaryRow {
                    alert_id: a.id,
                    category: a.category,
                    severity: a.severity,
                    message: a.message.clone(),
                    region: a.region.clone(),
                })
                .collect(),
        )
    }
}

impl fmt::Display for AlertDetailView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertDetailView::Empty => writeln!(f, "{EMPTY_STATE_TEXT}"),
            AlertDetailView::Summary(rows) => {
                for row in rows {
                    writeln!(
                        f,
                        "[{:<6}] {:<40} {}",
                        row.severity.label(),
                        row.message,
                        row.region
                    )?;
                }
                Ok(())
            }
            AlertDetailView::Detail(d) => {
                writeln!(f, "{}", d.message)?;
                writeln!(f, "{}  |  {}", d.severity_badge, d.region)?;
                writeln!(f)?;
                writeln!(f, "{}", d.details)?;
                writeln!(f)?;
                writeln!(f, "Affected areas: {}", d.affected_areas.join(", "))?;
                writeln!(f, "Recommendations:")?;
                for r in &d.recommendations {
                    writeln!(f, "  {r}")?;
                }
                writeln!(f, "Reported {}", d.created_at)
            }
        }
    }
}
