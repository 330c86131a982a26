use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;

use crate::policy::{SimulationMetrics, SimulationParameters, Simulator, WeatherScenario};

/// Spread of one policy metric across seeded runs.
#[derive(Debug, Clone, PartialEq)]
pub struct DistStats {
    pub n: usize,
    pub min: f64,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
    pub max: f64,
    pub mean: f64,
}

/// Cross-run distribution of one scenario's aggregate metrics.
#[derive(Debug, Clone)]
pub struct ScenarioDist {
    pub scenario: WeatherScenario,
    pub loss_ratio: DistStats,
    pub net_position: DistStats,
    pub total_payouts: DistStats,
    pub payout_months: DistStats,
    pub risk_score: f64,
}

/// Linearly interpolated quantile of an ascending, non-empty slice.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let h = p * (sorted.len() - 1) as f64;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (sorted[hi] - sorted[lo]) * (h - lo as f64)
}

/// Distribution of `metric` over `runs`. `None` when there are no runs.
pub fn metric_dist(
    runs: &[SimulationMetrics],
    metric: impl Fn(&SimulationMetrics) -> f64,
) -> Option<DistStats> {
    let mut values: Vec<f64> = runs.iter().map(metric).filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    Some(DistStats {
        n: values.len(),
        min: values[0],
        p5: quantile(&values, 0.05),
        p50: quantile(&values, 0.50),
        p95: quantile(&values, 0.95),
        max: values[values.len() - 1],
        mean: values.iter().sum::<f64>() / values.len() as f64,
    })
}

/// Run one seeded simulation per seed in `start_seed..start_seed + runs`.
/// Runs are independent, so they execute in parallel; the result is in seed
/// order.
pub fn run_many(
    simulator: Simulator,
    params: &SimulationParameters,
    scenario: WeatherScenario,
    start_seed: u64,
    runs: u64,
) -> Vec<SimulationMetrics> {
    (start_seed..start_seed + runs)
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let series = simulator.simulate(params, scenario, &mut rng);
            SimulationMetrics::compute(&series, params, scenario)
        })
        .collect()
}

/// Summarise runs of a single scenario. `None` when there are no runs.
pub fn summarise(scenario: WeatherScenario, runs: &[SimulationMetrics]) -> Option<ScenarioDist> {
    Some(ScenarioDist {
        scenario,
        loss_ratio: metric_dist(runs, |m| m.loss_ratio)?,
        net_position: metric_dist(runs, |m| m.net_position)?,
        total_payouts: metric_dist(runs, |m| m.total_payouts)?,
        payout_months: metric_dist(runs, |m| m.payout_months as f64)?,
        risk_score: runs.first()?.risk_score,
    })
}

/// Distribution of every scenario under the same parameters.
pub fn analyse_scenarios(
    simulator: Simulator,
    params: &SimulationParameters,
    start_seed: u64,
    runs: u64,
) -> Vec<ScenarioDist> {
    WeatherScenario::ALL
        .iter()
        .filter_map(|&scenario| {
            let metrics = run_many(simulator, params, scenario, start_seed, runs);
            summarise(scenario, &metrics)
        })
        .collect()
}
