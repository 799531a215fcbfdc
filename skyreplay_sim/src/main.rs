//! SkyReplay Simulator CLI
//!
//! Replay demo scenarios or recorded tracks headlessly on a virtual clock.

use clap::Parser;
use skyreplay_core::{CameraMode, ReplayConfig};
use skyreplay_sim::scenarios::{Scenario, ScenarioId};
use skyreplay_sim::{ReplayRunner, RunResult, SimConfig, SimError};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// SkyReplay headless replay CLI
#[derive(Parser, Debug)]
#[command(name = "skyreplay-sim")]
#[command(about = "Replay flight anomaly scenarios on a virtual clock", long_about = None)]
struct Args {
    /// Track file (JSON object or array); replaces --scenario
    #[arg(short, long)]
    tracks: Option<String>,

    /// Scenario to run (near_miss, climbout, parallel, stale_secondary, sparse_data, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Primary track id (defaults to the scenario's / file's first track)
    #[arg(short, long)]
    primary: Option<String>,

    /// Playback speed multiplier
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Simulated frames per second
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Maximum replay duration in seconds
    #[arg(short, long, default_value = "300")]
    duration: f64,

    /// Camera mode (orbit, chase)
    #[arg(long, default_value = "orbit")]
    camera: CameraMode,

    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Engine configuration file (JSON, partial allowed)
    #[arg(long)]
    config: Option<String>,

    /// Force every basemap bake to fail
    #[arg(long)]
    basemap_fail: bool,

    /// Export replay frames to a JSON file (single scenario only)
    #[arg(long)]
    export: Option<String>,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn load_scenarios(args: &Args, seed: u64) -> Result<Vec<(Scenario, Option<ScenarioId>)>, SimError> {
    if let Some(path) = &args.tracks {
        return Ok(vec![(Scenario::from_file(path, args.primary.as_deref())?, None)]);
    }

    let ids = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().map_err(SimError::Scenario)?]
    };

    ids.into_iter()
        .map(|id| {
            let mut scenario = id.build(seed)?;
            if let Some(primary) = &args.primary {
                scenario.primary_id = primary.clone();
            }
            Ok::<_, SimError>((scenario, Some(id)))
        })
        .collect()
}

fn load_config(path: Option<&str>) -> Result<ReplayConfig, SimError> {
    match path {
        Some(path) => Ok(ReplayConfig::from_json(&std::fs::read_to_string(path)?)?),
        None => Ok(ReplayConfig::default()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("SkyReplay Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Determine seed
    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let replay_config = load_config(args.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let scenarios = load_scenarios(&args, seed).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("Available scenarios (or 'all'):");
        for id in ScenarioId::all() {
            eprintln!("  {:<16} {}", id.name(), id.description());
        }
        std::process::exit(1);
    });

    if args.export.is_some() && scenarios.len() > 1 {
        eprintln!("Error: --export only supports a single scenario, not 'all'");
        std::process::exit(1);
    }

    let runner = ReplayRunner::new(
        SimConfig {
            seed,
            fps: args.fps,
            max_duration_secs: args.duration,
            speed: args.speed,
            camera_mode: args.camera,
            basemap_fails: args.basemap_fail,
            ..SimConfig::default()
        },
        replay_config,
    );

    let mut all_results: Vec<RunResult> = Vec::new();
    let mut failed_count = 0;

    for (scenario, expect) in &scenarios {
        if let Some(id) = expect {
            info!("▶ {}: {}", id, id.description());
        }
        let (result, export) = match runner.run(scenario, *expect).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("✗ {} could not start: {}", scenario.name, e);
                failed_count += 1;
                continue;
            }
        };

        if let Some(path) = &args.export {
            if let Err(e) = export.write_to_file(path) {
                error!("Failed to write export: {:?}", e);
            } else {
                info!("Exported {} frames to {}", export.frames.len(), path);
            }
        }

        if !args.json {
            if result.passed {
                info!(
                    "✓ {} (seed={}) PASSED in {} frames, min separation {}",
                    result.scenario,
                    seed,
                    result.total_frames,
                    result
                        .min_separation_nm
                        .map(|nm| format!("{:.2} NM", nm))
                        .unwrap_or_else(|| "n/a".into())
                );
            } else {
                error!(
                    "✗ {} (seed={}) FAILED: {}",
                    result.scenario,
                    seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }

        if !result.passed {
            failed_count += 1;
        }
        all_results.push(result);
    }

    let total = scenarios.len();
    let passed = total - failed_count;

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario,
                    "seed": r.seed,
                    "passed": r.passed,
                    "frames": r.total_frames,
                    "time_secs": r.final_time_secs,
                    "final_index": r.final_index,
                    "min_separation_nm": r.min_separation_nm,
                    "worst_severity": r.worst_severity,
                    "ground": r.ground,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} replay runs passed!", total);
        } else {
            error!("❌ {}/{} replay runs failed!", failed_count, total);
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
