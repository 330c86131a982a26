use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::Serialize;

pub const COUNTIES: [&str; 6] = ["Makueni", "Kitui", "Kisumu", "Nairobi", "Meru", "Nakuru"];

/// Credit scores never drift outside this range.
pub const MIN_SCORE: f64 = 20.0;
pub const MAX_SCORE: f64 = 100.0;

pub const HEALTHY_THRESHOLD: f64 = 70.0;
pub const WATCHLIST_THRESHOLD: f64 = 45.0;

pub const INSIGHTS: [&str; 3] = [
    "AI Insight: Slight improvement in credit health observed across Machakos County.",
    "AI Insight: Drought risk increased — watchlist farmers may rise by 10% next cycle.",
    "AI Insight: Overall portfolio stable. Continuous monitoring in progress...",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Borrower {
    pub name: String,
    pub county: &'static str,
    pub loan_amount: u64,
    /// 0–100 scale.
    pub credit_score: f64,
    pub updated: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CreditBand {
    Healthy,
    Watchlist,
    AtRisk,
}

impl CreditBand {
    pub fn from_score(score: f64) -> Self {
        if score >= HEALTHY_THRESHOLD {
            CreditBand::Healthy
        } else if score >= WATCHLIST_THRESHOLD {
            CreditBand::Watchlist
        } else {
            CreditBand::AtRisk
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CreditBand::Healthy => "Healthy",
            CreditBand::Watchlist => "Watchlist",
            CreditBand::AtRisk => "At Risk",
        }
    }
}

/// Pie-chart input: borrower counts per band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Distribution {
    pub healthy: usize,
    pub watchlist: usize,
    pub at_risk: usize,
}

#[derive(Debug, Clone)]
pub struct Portfolio {
    pub borrowers: Vec<Borrower>,
    pub insight: Option<&'static str>,
}

impl Portfolio {
    /// One mock borrower per county, updated one day apart going back from
    /// `today`.
    pub fn mock(today: NaiveDate, rng: &mut impl Rng) -> Self {
        let borrowers = COUNTIES
            .iter()
            .enumerate()
            .map(|(i, &county)| Borrower {
                name: format!("Farmer {}", i + 1),
                county,
                loan_amount: (50_000.0 + rng.random::<f64>() * 400_000.0).round() as u64,
                credit_score: (30.0 + rng.random::<f64>() * 70.0).round(),
                updated: today - Duration::days(i as i64),
            })
            .collect();
        Portfolio { borrowers, insight: None }
    }

    /// One drift step: every score moves by U(-5, 5), clamped, and the
    /// insight line is redrawn.
    pub fn on_tick(&mut self, rng: &mut impl Rng) {
        for b in &mut self.borrowers {
            let delta = rng.random::<f64>() * 10.0 - 5.0;
            b.credit_score = (b.credit_score + delta).clamp(MIN_SCORE, MAX_SCORE);
        }
        self.insight = Some(insight_for(rng.random()));
    }

    pub fn distribution(&self) -> Distribution {
        let mut d = Distribution::default();
        for b in &self.borrowers {
            match CreditBand::from_score(b.credit_score) {
                CreditBand::Healthy => d.healthy += 1,
                CreditBand::Watchlist => d.watchlist += 1,
                CreditBand::AtRisk => d.at_risk += 1,
            }
        }
        d
    }

    pub fn average_score(&self) -> f64 {
        if self.borrowers.is_empty() {
            return 0.0;
        }
        self.borrowers.iter().map(|b| b.credit_score).sum::<f64>() / self.borrowers.len() as f64
    }
}

pub fn insight_for(draw: f64) -> &'static str {
    if draw < 0.3 {
        INSIGHTS[0]
    } else if draw < 0.6 {
        INSIGHTS[1]
    } else {
        INSIGHTS[2]
    }
}
