//! LazyFlock Simulator CLI
//!
//! Run deterministic flocking scenarios across one or many seeds.

use clap::Parser;
use lazyflock_sim::scenarios::ScenarioId;
use lazyflock_sim::{ScenarioResult, ScenarioRunner};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// LazyFlock deterministic scenario CLI
#[derive(Parser, Debug)]
#[command(name = "lazyflock-sim")]
#[command(about = "Run deterministic flocking scenarios for LazyFlock", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (consensus, isolation, star_hub, wrap_around,
    /// vicsek_flock, acs_flock, standard, audits, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Episode length for the isolation and audit scenarios
    #[arg(short, long, default_value = "300")]
    max_steps: usize,

    /// Run seeds on parallel threads
    #[arg(short, long)]
    parallel: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export the episode recording of a single scenario to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn parse_scenarios(name: &str) -> Result<Vec<ScenarioId>, String> {
    match name {
        "all" => Ok(ScenarioId::all()),
        "standard" => Ok(ScenarioId::standard()),
        "audits" => Ok(ScenarioId::audits()),
        other => other.parse().map(|s| vec![s]),
    }
}

fn report(result: &ScenarioResult) {
    if result.passed {
        info!(
            "✓ {} (seed={}) PASSED in {} steps",
            result.scenario.name(),
            result.seed,
            result.metrics.steps
        );
    } else {
        error!(
            "✗ {} (seed={}) FAILED: {}",
            result.scenario.name(),
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("LazyFlock Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios = parse_scenarios(&args.scenario).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("Available scenarios:");
        for scenario in ScenarioId::all() {
            eprintln!("  {:<14} {}", scenario.name(), scenario.description());
        }
        eprintln!("  standard, audits, all: groups of the above");
        std::process::exit(1);
    });

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario");
            std::process::exit(1);
        }

        info!("Running with export to: {}", export_path);
        let result = ScenarioRunner::new(base_seed)
            .with_max_steps(args.max_steps)
            .with_recording(true)
            .run(scenarios[0]);
        report(&result);

        match &result.recording {
            Some(recording) => match recording.write_to_file(export_path) {
                Ok(()) => info!("Exported {} frames to {}", recording.len(), export_path),
                Err(e) => {
                    error!("Failed to write export: {}", e);
                    std::process::exit(1);
                }
            },
            None => error!("Scenario produced no recording"),
        }

        if !result.passed {
            std::process::exit(1);
        }
        return;
    }

    let seeds: Vec<u64> = (0..args.seeds as u64).map(|i| base_seed.wrapping_add(i)).collect();
    let runner = ScenarioRunner::new(base_seed).with_max_steps(args.max_steps);

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    for scenario in &scenarios {
        let results = if args.parallel {
            runner.run_parallel(*scenario, &seeds)
        } else {
            seeds
                .iter()
                .map(|&seed| {
                    ScenarioRunner::new(seed)
                        .with_max_steps(args.max_steps)
                        .run(*scenario)
                })
                .collect()
        };

        if !args.json {
            results.iter().for_each(report);
        }
        all_results.extend(results);
    }

    // Summary
    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "steps": r.metrics.steps,
                    "num_agents": r.metrics.num_agents,
                    "total_reward": r.metrics.total_reward,
                    "final_alignment": r.metrics.final_alignment,
                    "final_spatial_entropy": r.metrics.final_spatial_entropy,
                    "lost_comm_step": r.metrics.lost_comm_step,
                    "invariant_violations": r.metrics.invariant_violations,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
