use std::env;

use agririsk::config::AppConfig;
use agririsk::policy::{SimulationMetrics, Simulator, WeatherScenario};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn main() {
    let config = AppConfig::canonical();

    let scenario = match env::args().nth(1) {
        Some(name) => WeatherScenario::parse(&name).unwrap_or_else(|| {
            eprintln!("error: unknown scenario {name:?}");
            eprintln!(
                "expected one of: {}",
                WeatherScenario::ALL.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
            );
            std::process::exit(2);
        }),
        None => WeatherScenario::default(),
    };
    let seed: u64 = env::args().nth(2).and_then(|s| s.parse().ok()).unwrap_or(config.seed);

    let params = &config.policy_defaults;
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let series = Simulator::new(config.payout_trigger).simulate(params, scenario, &mut rng);

    // Write NDJSON to stdout.
    for month in &series {
        match serde_json::to_string(month) {
            Ok(line) => println!("{line}"),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
    }

    let m = SimulationMetrics::compute(&series, params, scenario);
    eprintln!(
        "policy_sim: {} ({} mm, {} °C), seed {seed}",
        scenario.name(),
        scenario.rainfall_mm(),
        scenario.temperature_c()
    );
    eprintln!("  total premiums  {:>14.2}", m.total_premiums);
    eprintln!("  total payouts   {:>14.2}", m.total_payouts);
    eprintln!("  net position    {:>14.2}", m.net_position);
    eprintln!("  loss ratio      {:>13.1}%", m.loss_ratio);
    eprintln!("  risk score      {:>14.1}", m.risk_score);
    eprintln!("  payout months   {:>14}", m.payout_months);
}
