use std::fs::File;
use std::io::{BufWriter, Write};

use agririsk::alerts::AlertCategory;
use agririsk::analysis::{self, DistStats, ScenarioDist};
use agririsk::config::AppConfig;
use agririsk::events::{Event, SimEvent};
use agririsk::map::{DrawnShape, LatLng, Overlay};
use agririsk::policy::{Simulator, WeatherScenario};
use agririsk::presentation::AlertsPanel;
use agririsk::session::Session;
use agririsk::types::{AlertId, Millis, View};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut seed_override: Option<u64> = None;
    let mut seconds: u64 = 120;
    let mut config_path: Option<String> = None;
    let mut output_path = "events.ndjson".to_string();
    let mut quiet = false;
    let mut runs: Option<u64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                i += 1;
                seed_override = Some(parse_arg(&args, i, "--seed requires a u64"));
            }
            "--seconds" => {
                i += 1;
                seconds = parse_arg(&args, i, "--seconds requires a u64");
            }
            "--config" => {
                i += 1;
                config_path = Some(parse_arg(&args, i, "--config requires a path"));
            }
            "--output" => {
                i += 1;
                output_path = parse_arg(&args, i, "--output requires a path");
            }
            "--quiet" => quiet = true,
            "--runs" => {
                i += 1;
                runs = Some(parse_arg(&args, i, "--runs requires a positive integer"));
            }
            other => eprintln!("ignoring unknown argument {other}"),
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => AppConfig::from_json_file(&path).unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        }),
        None => AppConfig::canonical(),
    };
    if let Some(seed) = seed_override {
        config.seed = seed;
    }

    if let Some(n) = runs {
        let simulator = Simulator::new(config.payout_trigger);
        let dists = analysis::analyse_scenarios(simulator, &config.policy_defaults, config.seed, n);
        if !quiet {
            print_distributions(&dists, n);
        }
        return;
    }

    let horizon = Millis::from_secs(seconds);
    let mut session = Session::from_config(config).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });
    session.start();
    script_demo(&mut session, horizon);
    session.schedule(horizon, Event::SessionEnd);
    session.run();

    if let Err(e) = write_log(&output_path, &session.log) {
        eprintln!("error: failed to write {output_path}: {e}");
        std::process::exit(1);
    }

    if !quiet {
        print_summary(&session);
    }
}

fn parse_arg<T: std::str::FromStr>(args: &[String], i: usize, msg: &str) -> T {
    match args.get(i).and_then(|s| s.parse().ok()) {
        Some(v) => v,
        None => {
            eprintln!("error: {msg}");
            std::process::exit(2);
        }
    }
}

/// A scripted walk through every page, spread over the first half of the
/// session so the live feed keeps running underneath.
fn script_demo(session: &mut Session, horizon: Millis) {
    let step = Millis((horizon.0 / 12).max(1));
    let at = |k: u64| Millis(step.0 * k);

    session.schedule(at(1), Event::OpenPanel);
    session.schedule(at(1), Event::AlertClicked { alert_id: AlertId(2) });
    session.schedule(at(2), Event::Navigate { view: View::Map });
    session.schedule(
        at(2),
        Event::ShapeCompleted {
            shape: DrawnShape::Rectangle {
                south_west: LatLng::new(-1.6, 37.3),
                north_east: LatLng::new(-1.2, 37.9),
            },
        },
    );
    session.schedule(
        at(2),
        Event::ShapeCompleted {
            shape: DrawnShape::Circle { center: LatLng::new(-1.0, 38.0), radius_m: 12_000.0 },
        },
    );
    session.schedule(at(3), Event::OverlaySelected { overlay: Overlay::RiskHeatmap });
    session.schedule(at(3), Event::OpacityChanged { opacity: 0.5 });
    session.schedule(at(4), Event::Navigate { view: View::Portfolio });
    session.schedule(at(5), Event::Navigate { view: View::PolicySimulation });
    session.schedule(at(5), Event::ScenarioSelected { scenario: WeatherScenario::DroughtRisk });
    session.schedule(at(5), Event::RunSimulation);
    session.schedule(at(6), Event::Navigate { view: View::Dashboard });
}

fn write_log(path: &str, log: &[SimEvent]) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for e in log {
        serde_json::to_writer(&mut writer, e)?;
        writeln!(writer)?;
    }
    writer.flush()
}

fn print_summary(session: &Session) {
    let raised: Vec<AlertCategory> = session
        .log
        .iter()
        .filter_map(|e| match &e.event {
            Event::AlertRaised { category, .. } => Some(*category),
            _ => None,
        })
        .collect();
    let warnings = raised.iter().filter(|c| **c == AlertCategory::Warning).count();

    println!("Events fired: {}", session.log.len());
    println!(
        "Alerts raised: {} ({} warning, {} success)",
        raised.len(),
        warnings,
        raised.len() - warnings
    );
    println!("Audio cues played: {}", session.audio.played.len());

    println!("\n=== Alert feed at {} ===", session.wall_clock().format("%Y-%m-%d %H:%M:%S UTC"));
    print!("{}", AlertsPanel::listing(&session.store));

    println!("\n{}", session.alert_detail());
}

fn print_dist_row(label: &str, ds: &DistStats, scale: f64) {
    println!(
        "{:<16} | {:>10.1} | {:>10.1} | {:>10.1} | {:>10.1} | {:>10.1} | {:>10.1}",
        label,
        ds.min * scale,
        ds.p5 * scale,
        ds.p50 * scale,
        ds.p95 * scale,
        ds.max * scale,
        ds.mean * scale,
    );
}

fn print_distributions(dists: &[ScenarioDist], n_runs: u64) {
    println!("=== Policy distribution (N={n_runs} runs per scenario) ===");
    for d in dists {
        println!("\n--- {} (risk score {:.1}) ---", d.scenario.name(), d.risk_score);
        println!(
            "{:<16} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10}",
            "", "min", "p5", "p50", "p95", "max", "mean"
        );
        print_dist_row("LossR%", &d.loss_ratio, 1.0);
        print_dist_row("Payouts (K)", &d.total_payouts, 0.001);
        print_dist_row("Net (K)", &d.net_position, 0.001);
        print_dist_row("Payout months", &d.payout_months, 1.0);
    }
}
