//! # GLIDE Link Simulator
//!
//! Runs an owner and a proxy body across a simulated network and reports
//! how closely the proxy tracks the truth.
//!
//! ## Usage
//!
//! ```bash
//! glide_sim --network poor --preset internet --duration 30 --seed 7
//! glide_sim --config sync.toml --path line
//! ```

use glide_sync::simulation::{run_scenario, MotionPath, NetworkConditions, ScenarioConfig};
use glide_sync::SyncConfig;

fn print_help() {
    println!("Usage: glide_sim [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -n, --network <NAME>    perfect | good | average | poor (default: average)");
    println!("  -p, --preset <NAME>     lan | internet | default (default: internet)");
    println!("  -c, --config <FILE>     Load synchronizer settings from a TOML file");
    println!("  -d, --duration <SECS>   Simulated seconds (default: 10)");
    println!("  -t, --tick-rate <HZ>    Proxy tick rate (default: 60)");
    println!("      --path <NAME>       circle | line (default: circle)");
    println!("  -s, --seed <SEED>       Link random seed");
    println!("  -h, --help              Show this help");
}

fn main() {
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         GLIDE LINK SIMULATOR                                     ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    // Parse command line arguments (simple parsing, no external deps)
    let args: Vec<String> = std::env::args().collect();
    let mut scenario = ScenarioConfig::default();
    let mut network_name = String::from("average");
    let mut preset_name = String::from("internet");
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--network" | "-n" => {
                if let Some(v) = value {
                    network_name.clone_from(v);
                    i += 1;
                }
            }
            "--preset" | "-p" => {
                if let Some(v) = value {
                    preset_name.clone_from(v);
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if let Some(v) = value {
                    config_path = Some(v.clone());
                    i += 1;
                }
            }
            "--duration" | "-d" => {
                if let Some(v) = value {
                    scenario.duration = v.parse().unwrap_or(scenario.duration);
                    i += 1;
                }
            }
            "--tick-rate" | "-t" => {
                if let Some(v) = value {
                    scenario.tick_rate = v.parse().unwrap_or(scenario.tick_rate);
                    i += 1;
                }
            }
            "--path" => {
                if let Some(v) = value {
                    if v == "line" {
                        scenario.path = MotionPath::Line { speed: 5.0 };
                    }
                    i += 1;
                }
            }
            "--seed" | "-s" => {
                if let Some(v) = value {
                    scenario.seed = v.parse().unwrap_or(scenario.seed);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                return;
            }
            other => {
                eprintln!("Unknown argument: {other}");
            }
        }
        i += 1;
    }

    let Some(network) = NetworkConditions::by_name(&network_name) else {
        eprintln!("Unknown network preset: {network_name}");
        std::process::exit(2);
    };
    scenario.network = network;

    let config = match &config_path {
        Some(path) => {
            let loaded = std::fs::read_to_string(path)
                .map_err(|e| e.to_string())
                .and_then(|text| SyncConfig::from_toml_str(&text).map_err(|e| e.to_string()));
            match loaded {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("Failed to load {path}: {err}");
                    std::process::exit(2);
                }
            }
        }
        None => {
            let Some(config) = SyncConfig::by_name(&preset_name) else {
                eprintln!("Unknown synchronizer preset: {preset_name}");
                std::process::exit(2);
            };
            config
        }
    };

    println!("┌─ CONFIGURATION ─────────────────────────────────────────────────┐");
    println!(
        "│ Network:            {network_name} ({} ms ± {} ms, {}% loss)",
        network.base_latency_ms, network.jitter_ms, network.packet_loss_percent
    );
    println!("│ Synchronizer:       {}", config_path.as_deref().unwrap_or(&preset_name));
    println!("│ Interpolation:      {:?}", config.interpolation);
    println!("│ Buffering delay:    {} s", config.buffering_delay);
    println!("│ Duration:           {} s at {} Hz", scenario.duration, scenario.tick_rate);
    println!("│ Seed:               {}", scenario.seed);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    match run_scenario(config, &scenario) {
        Ok(report) => {
            println!("┌─ RESULTS ───────────────────────────────────────────────────────┐");
            for line in report.to_string().lines() {
                println!("│ {line}");
            }
            println!("└──────────────────────────────────────────────────────────────────┘");
        }
        Err(err) => {
            eprintln!("Simulation failed: {err}");
            std::process::exit(1);
        }
    }
}
