use std::f64::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const MONTHS: [&str; 12] =
    ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

/// Monthly rainfall below this pays out under the rainfall trigger.
pub const CRITICAL_RAINFALL_MM: f64 = 70.0;

/// No single month pays more than this fraction of the coverage amount.
pub const PAYOUT_CAP_FRACTION: f64 = 0.5;

/// Rainfall is drawn uniformly within ±20 % of the scenario base.
const RAINFALL_SPREAD: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WeatherScenario {
    #[default]
    Normal,
    DroughtRisk,
    ExcessRainfall,
    SevereDrought,
}

impl WeatherScenario {
    pub const ALL: [WeatherScenario; 4] = [
        WeatherScenario::Normal,
        WeatherScenario::DroughtRisk,
        WeatherScenario::ExcessRainfall,
        WeatherScenario::SevereDrought,
    ];

    /// Base monthly rainfall in mm.
    pub fn rainfall_mm(self) -> f64 {
        match self {
            WeatherScenario::Normal => 100.0,
            WeatherScenario::DroughtRisk => 60.0,
            WeatherScenario::ExcessRainfall => 150.0,
            WeatherScenario::SevereDrought => 40.0,
        }
    }

    /// Mean temperature in °C.
    pub fn temperature_c(self) -> f64 {
        match self {
            WeatherScenario::Normal => 25.0,
            WeatherScenario::DroughtRisk => 32.0,
            WeatherScenario::ExcessRainfall => 22.0,
            WeatherScenario::SevereDrought => 35.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WeatherScenario::Normal => "Normal Season",
            WeatherScenario::DroughtRisk => "Drought Risk",
            WeatherScenario::ExcessRainfall => "Excess Rainfall",
            WeatherScenario::SevereDrought => "Severe Drought",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            WeatherScenario::Normal => "Average conditions",
            WeatherScenario::DroughtRisk => "Below average rainfall, high temps",
            WeatherScenario::ExcessRainfall => "Above average rainfall",
            WeatherScenario::SevereDrought => "Critical water shortage",
        }
    }

    /// Parse a scenario from its variant name or display name, ignoring case
    /// and separators ("severe-drought", "SevereDrought", "Severe Drought").
    pub fn parse(s: &str) -> Option<Self> {
        let key: String =
            s.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>().to_lowercase();
        match key.as_str() {
            "normal" | "normalseason" => Some(WeatherScenario::Normal),
            "droughtrisk" => Some(WeatherScenario::DroughtRisk),
            "excessrainfall" => Some(WeatherScenario::ExcessRainfall),
            "severedrought" => Some(WeatherScenario::SevereDrought),
            _ => None,
        }
    }

    /// Synthetic risk on a 0–10 scale for this scenario's rainfall band.
    fn base_risk(self) -> f64 {
        let rain = self.rainfall_mm();
        if rain < 50.0 {
            8.5
        } else if rain < CRITICAL_RAINFALL_MM {
            6.5
        } else if rain > 120.0 {
            5.0
        } else {
            3.0
        }
    }
}

/// Inputs a user adjusts on the simulation page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    pub farmer_name: String,
    pub farm_location: String,
    /// Monthly premium per policy (KES).
    pub premium: f64,
    /// Coverage per policy (KES).
    pub coverage_amount: f64,
    /// Acres.
    pub land_size: f64,
    pub number_of_policies: u32,
    /// Used by the combined trigger only.
    pub rainfall_threshold_mm: f64,
    /// Used by the combined trigger only.
    pub ndvi_threshold: f64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        SimulationParameters {
            farmer_name: String::new(),
            farm_location: String::new(),
            premium: 50_000.0,
            coverage_amount: 500_000.0,
            land_size: 5.0,
            number_of_policies: 100,
            rainfall_threshold_mm: 80.0,
            ndvi_threshold: 0.4,
        }
    }
}

/// A slider on the parameter panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterField {
    RainfallThreshold,
    NdviThreshold,
    Premium,
    CoverageAmount,
    LandSize,
    NumberOfPolicies,
}

impl ParameterField {
    /// Slider bounds (min, max).
    pub fn range(self) -> (f64, f64) {
        match self {
            ParameterField::RainfallThreshold => (40.0, 120.0),
            ParameterField::NdviThreshold => (0.2, 0.7),
            ParameterField::Premium => (10_000.0, 200_000.0),
            ParameterField::CoverageAmount => (100_000.0, 2_000_000.0),
            ParameterField::LandSize => (1.0, 50.0),
            ParameterField::NumberOfPolicies => (10.0, 500.0),
        }
    }
}

impl SimulationParameters {
    /// Apply a slider value, clamped to the slider's bounds. Non-finite input
    /// is ignored.
    pub fn set(&mut self, field: ParameterField, value: f64) {
        if !value.is_finite() {
            return;
        }
        let (lo, hi) = field.range();
        let v = value.clamp(lo, hi);
        match field {
            ParameterField::RainfallThreshold => self.rainfall_threshold_mm = v,
            ParameterField::NdviThreshold => self.ndvi_threshold = v,
            ParameterField::Premium => self.premium = v,
            ParameterField::CoverageAmount => self.coverage_amount = v,
            ParameterField::LandSize => self.land_size = v,
            ParameterField::NumberOfPolicies => self.number_of_policies = v.round() as u32,
        }
    }
}

/// When a month pays out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PayoutTrigger {
    /// Rainfall below `critical_mm`; payout proportional to the shortfall.
    Rainfall { critical_mm: f64 },
    /// NDVI below the vegetation threshold or rainfall below the rainfall
    /// threshold; payout proportional to the NDVI shortfall.
    Combined,
}

impl Default for PayoutTrigger {
    fn default() -> Self {
        PayoutTrigger::Rainfall { critical_mm: CRITICAL_RAINFALL_MM }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthRecord {
    pub month: &'static str,
    pub rainfall: f64,
    pub ndvi: f64,
    pub triggered: bool,
    pub payout: f64,
}

pub type SimulationSeries = Vec<MonthRecord>;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Simulator {
    pub trigger: PayoutTrigger,
}

impl Simulator {
    pub fn new(trigger: PayoutTrigger) -> Self {
        Simulator { trigger }
    }

    /// Twelve synthetic months for `scenario`. Each month draws an NDVI
    /// jitter and a rainfall multiplier, in that order.
    pub fn simulate(
        &self,
        params: &SimulationParameters,
        scenario: WeatherScenario,
        rng: &mut impl Rng,
    ) -> SimulationSeries {
        let base_rain = scenario.rainfall_mm();
        let rainfall_factor = base_rain / 100.0;
        let cap = params.coverage_amount.max(0.0) * PAYOUT_CAP_FRACTION;

        MONTHS
            .iter()
            .enumerate()
            .map(|(index, &month)| {
                let base_ndvi = 0.6 + (rainfall_factor - 1.0) * 0.2;
                let seasonal = (index as f64 / 12.0 * PI * 2.0).sin() * 0.1;
                let jitter = (rng.random::<f64>() - 0.5) * 0.05;
                let ndvi = round_to((base_ndvi + seasonal + jitter).clamp(0.0, 1.0), 3);

                let spread = rng.random_range(1.0 - RAINFALL_SPREAD..1.0 + RAINFALL_SPREAD);
                let rainfall = round_to(base_rain * spread, 1);

                let (triggered, raw) = self.payout(params, rainfall, ndvi);
                let payout = round_to(raw.max(0.0), 2).min(cap);
                MonthRecord { month, rainfall, ndvi, triggered, payout }
            })
            .collect()
    }

    fn payout(&self, params: &SimulationParameters, rainfall: f64, ndvi: f64) -> (bool, f64) {
        let coverage = params.coverage_amount.max(0.0);
        match self.trigger {
            PayoutTrigger::Rainfall { critical_mm } => {
                if rainfall < critical_mm && critical_mm > 0.0 {
                    (true, coverage * (critical_mm - rainfall) / critical_mm)
                } else {
                    (false, 0.0)
                }
            }
            PayoutTrigger::Combined => {
                let triggered =
                    ndvi < params.ndvi_threshold || rainfall < params.rainfall_threshold_mm;
                if !triggered || params.ndvi_threshold <= 0.0 {
                    return (triggered, 0.0);
                }
                (true, coverage * (1.0 - ndvi / params.ndvi_threshold))
            }
        }
    }
}

/// Simulate with the rainfall trigger.
pub fn simulate(
    params: &SimulationParameters,
    scenario: WeatherScenario,
    rng: &mut impl Rng,
) -> SimulationSeries {
    Simulator::default().simulate(params, scenario, rng)
}

/// Portfolio-level figures derived from one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationMetrics {
    pub total_payouts: f64,
    pub total_premiums: f64,
    pub net_position: f64,
    /// Percent. Zero when there are no premiums.
    pub loss_ratio: f64,
    /// 0–10.
    pub risk_score: f64,
    pub payout_months: usize,
}

impl SimulationMetrics {
    pub fn compute(
        series: &[MonthRecord],
        params: &SimulationParameters,
        scenario: WeatherScenario,
    ) -> Self {
        let policies = params.number_of_policies as f64;
        let total_payouts = series.iter().map(|m| m.payout).sum::<f64>() * policies;
        let total_premiums = params.premium * policies * 12.0;
        let loss_ratio =
            if total_premiums > 0.0 { total_payouts / total_premiums * 100.0 } else { 0.0 };
        SimulationMetrics {
            total_payouts,
            total_premiums,
            net_position: total_premiums - total_payouts,
            loss_ratio,
            risk_score: risk_score(scenario, params.land_size),
            payout_months: series.iter().filter(|m| m.payout > 0.0).count(),
        }
    }
}

/// Scenario band plus a land-size adjustment, clamped to [0, 10].
pub fn risk_score(scenario: WeatherScenario, land_size: f64) -> f64 {
    let land = if land_size.is_finite() { land_size.max(0.0) } else { 0.0 };
    round_to((scenario.base_risk() + land * 0.05).clamp(0.0, 10.0), 1)
}

/// Page state for the simulation sandbox.
#[derive(Debug, Clone)]
pub struct PolicySimulationView {
    pub parameters: SimulationParameters,
    pub scenario: WeatherScenario,
    pub simulator: Simulator,
    pub series: SimulationSeries,
    pub has_simulated: bool,
}

impl PolicySimulationView {
    /// A preview series is generated up front; results stay hidden until the
    /// first explicit run.
    pub fn new(
        parameters: SimulationParameters,
        simulator: Simulator,
        rng: &mut impl Rng,
    ) -> Self {
        let scenario = WeatherScenario::default();
        let series = simulator.simulate(&parameters, scenario, rng);
        PolicySimulationView { parameters, scenario, simulator, series, has_simulated: false }
    }

    pub fn select_scenario(&mut self, scenario: WeatherScenario) {
        self.scenario = scenario;
    }

    pub fn run(&mut self, rng: &mut impl Rng) -> SimulationMetrics {
        self.series = self.simulator.simulate(&self.parameters, self.scenario, rng);
        self.has_simulated = true;
        let metrics = self.metrics();
        info!(
            scenario = self.scenario.name(),
            payout_months = metrics.payout_months,
            loss_ratio = metrics.loss_ratio,
            "policy simulation run"
        );
        metrics
    }

    /// Restore default parameters and the normal scenario. The last series
    /// is kept but hidden.
    pub fn reset(&mut self) {
        self.parameters = SimulationParameters::default();
        self.scenario = WeatherScenario::default();
        self.has_simulated = false;
    }

    pub fn metrics(&self) -> SimulationMetrics {
        SimulationMetrics::compute(&self.series, &self.parameters, self.scenario)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    fn rng(seed: u64) -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(seed)
    }

    #[test]
    fn series_has_twelve_canonical_months() {
        let series = simulate(&SimulationParameters::default(), WeatherScenario::Normal, &mut rng(1));
        let labels: Vec<&str> = series.iter().map(|m| m.month).collect();
        assert_eq!(labels, MONTHS);
    }

    #[test]
    fn rainfall_stays_within_twenty_percent_of_base() {
        for scenario in WeatherScenario::ALL {
            let series = simulate(&SimulationParameters::default(), scenario, &mut rng(9));
            let base = scenario.rainfall_mm();
            for m in &series {
                assert!(
                    m.rainfall >= base * 0.8 - 0.05 && m.rainfall <= base * 1.2 + 0.05,
                    "{scenario:?} {} rainfall {} outside ±20% of {base}",
                    m.month,
                    m.rainfall
                );
            }
        }
    }

    #[test]
    fn severe_drought_pays_most_months() {
        let params = SimulationParameters::default();
        let series = simulate(&params, WeatherScenario::SevereDrought, &mut rng(42));
        let paying = series.iter().filter(|m| m.payout > 0.0).count();
        assert!(paying > 6, "only {paying} of 12 months paid out");
    }

    #[test]
    fn excess_rainfall_never_pays_under_rainfall_trigger() {
        let series = simulate(
            &SimulationParameters::default(),
            WeatherScenario::ExcessRainfall,
            &mut rng(5),
        );
        assert!(series.iter().all(|m| m.payout == 0.0 && !m.triggered));
    }

    #[test]
    fn combined_trigger_payout_capped() {
        let params = SimulationParameters { ndvi_threshold: 0.7, ..Default::default() };
        let sim = Simulator::new(PayoutTrigger::Combined);
        let series = sim.simulate(&params, WeatherScenario::SevereDrought, &mut rng(11));
        let cap = params.coverage_amount * PAYOUT_CAP_FRACTION;
        assert!(series.iter().any(|m| m.triggered));
        assert!(series.iter().all(|m| m.payout >= 0.0 && m.payout <= cap));
    }

    #[test]
    fn same_seed_same_series() {
        let params = SimulationParameters::default();
        let a = simulate(&params, WeatherScenario::DroughtRisk, &mut rng(77));
        let b = simulate(&params, WeatherScenario::DroughtRisk, &mut rng(77));
        assert_eq!(a, b);
    }

    #[test]
    fn metrics_follow_definitions() {
        let params = SimulationParameters { number_of_policies: 10, premium: 1_000.0, ..Default::default() };
        let series: SimulationSeries = MONTHS
            .iter()
            .map(|&month| MonthRecord { month, rainfall: 50.0, ndvi: 0.5, triggered: true, payout: 100.0 })
            .collect();
        let m = SimulationMetrics::compute(&series, &params, WeatherScenario::Normal);
        assert_eq!(m.total_payouts, 12_000.0);
        assert_eq!(m.total_premiums, 120_000.0);
        assert_eq!(m.net_position, 108_000.0);
        assert!((m.loss_ratio - 10.0).abs() < 1e-9);
        assert_eq!(m.payout_months, 12);
    }

    #[test]
    fn zero_premium_loss_ratio_is_zero() {
        let params = SimulationParameters { premium: 0.0, ..Default::default() };
        let series = simulate(&params, WeatherScenario::SevereDrought, &mut rng(2));
        let m = SimulationMetrics::compute(&series, &params, WeatherScenario::SevereDrought);
        assert_eq!(m.loss_ratio, 0.0);
        assert!(m.net_position <= 0.0);
    }

    #[test]
    fn risk_score_bands_and_clamp() {
        assert_eq!(risk_score(WeatherScenario::Normal, 0.0), 3.0);
        assert_eq!(risk_score(WeatherScenario::DroughtRisk, 10.0), 7.0);
        assert_eq!(risk_score(WeatherScenario::ExcessRainfall, 0.0), 5.0);
        assert_eq!(risk_score(WeatherScenario::SevereDrought, 50.0), 10.0);
        assert_eq!(risk_score(WeatherScenario::Normal, f64::NAN), 3.0);
    }

    #[test]
    fn parameter_sliders_clamp() {
        let mut p = SimulationParameters::default();
        p.set(ParameterField::Premium, 5.0);
        assert_eq!(p.premium, 10_000.0);
        p.set(ParameterField::NumberOfPolicies, 10_000.0);
        assert_eq!(p.number_of_policies, 500);
        p.set(ParameterField::LandSize, f64::INFINITY);
        assert_eq!(p.land_size, 5.0);
    }

    #[test]
    fn scenario_parse_accepts_common_spellings() {
        assert_eq!(WeatherScenario::parse("severe-drought"), Some(WeatherScenario::SevereDrought));
        assert_eq!(WeatherScenario::parse("Drought Risk"), Some(WeatherScenario::DroughtRisk));
        assert_eq!(WeatherScenario::parse("ExcessRainfall"), Some(WeatherScenario::ExcessRainfall));
        assert_eq!(WeatherScenario::parse("monsoon"), None);
    }

    #[test]
    fn view_run_and_reset() {
        let mut r = rng(4);
        let mut view =
            PolicySimulationView::new(SimulationParameters::default(), Simulator::default(), &mut r);
        assert!(!view.has_simulated);
        view.parameters.set(ParameterField::Premium, 100_000.0);
        view.select_scenario(WeatherScenario::SevereDrought);
        let metrics = view.run(&mut r);
        assert!(view.has_simulated);
        assert!(metrics.payout_months > 6);
        view.reset();
        assert_eq!(view.parameters, SimulationParameters::default());
        assert_eq!(view.scenario, WeatherScenario::Normal);
        assert!(!view.has_simulated);
    }

    proptest! {
        #[test]
        fn payouts_bounded_by_cap(
            seed in any::<u64>(),
            coverage in 100_000.0f64..2_000_000.0,
            scenario_idx in 0usize..4,
            combined in any::<bool>(),
        ) {
            let params = SimulationParameters { coverage_amount: coverage, ..Default::default() };
            let trigger = if combined { PayoutTrigger::Combined } else { PayoutTrigger::default() };
            let series = Simulator::new(trigger)
                .simulate(&params, WeatherScenario::ALL[scenario_idx], &mut rng(seed));
            prop_assert_eq!(series.len(), 12);
            for m in &series {
                prop_assert!(m.payout >= 0.0);
                prop_assert!(m.payout <= coverage * PAYOUT_CAP_FRACTION);
                prop_assert!((0.0..=1.0).contains(&m.ndvi));
            }
        }
    }
}
