//! rb-verify: CLI for verifying the ring buffer.
//!
//! # Usage
//!
//! ```bash
//! rb-verify dst --seed 12345 --iterations 100 --faults aggressive
//! rb-verify model --capacity 4 --writes-max 10
//! rb-verify scenarios --capacity 4
//! ```
//!
//! Outputs JSON to stdout; logs go to stderr (`RUST_LOG`, default `warn`).
//! Exits with status 1 when any check fails.

use std::process;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rb_buffer::RingBuffer;
use rb_dst::{DstHarness, FaultConfig, HarnessConfig};
use rb_stateright::{verify_implementation, verify_model, ModelConfig, VerifierConfig};

/// Upper bound on DST iterations per invocation.
const ITERATIONS_MAX: u64 = 1_000_000;

/// Verify the ring buffer and output JSON results.
#[derive(Parser, Debug)]
#[command(name = "rb-verify")]
#[command(about = "Deterministic simulation, model checking and scenario replay for the ring buffer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seeded random workloads with fault injection.
    Dst {
        /// First DST seed (random if not set). Iteration i uses seed + i.
        #[arg(long)]
        seed: Option<u64>,

        /// Number of seeds to run.
        #[arg(long, default_value_t = 10)]
        iterations: u64,

        /// Buffer capacity.
        #[arg(long, default_value_t = 8)]
        capacity: usize,

        /// Operations per seed.
        #[arg(long, default_value_t = 1_000)]
        operations: u64,

        /// Fault profile: none, default or aggressive.
        #[arg(long, default_value = "default")]
        faults: String,
    },
    /// Exhaustive stateright model check.
    Model {
        #[arg(long, default_value_t = 3)]
        capacity: usize,

        /// Accepted writes after which exploration stops.
        #[arg(long, default_value_t = 6)]
        writes_max: usize,
    },
    /// Replay the canonical scenarios against `RingBuffer<u8>`.
    Scenarios {
        #[arg(long, default_value_t = 4)]
        capacity: usize,
    },
}

fn parse_faults(s: &str) -> Result<FaultConfig, String> {
    match s.to_lowercase().as_str() {
        "none" => Ok(FaultConfig::none()),
        "default" => Ok(FaultConfig::default()),
        "aggressive" => Ok(FaultConfig::aggressive()),
        _ => Err(format!("Unknown fault profile: {s}. Expected: none, default, aggressive")),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run `iterations` harness seeds; stop at the first failing one.
fn run_dst(seed: u64, iterations: u64, config: HarnessConfig) -> (Value, bool) {
    let iterations = iterations.min(ITERATIONS_MAX);
    let mut operations_total = 0;
    let mut faults_total = 0;
    let mut failure = None;
    let mut iterations_run = 0;

    for i in 0..iterations {
        let run_seed = seed.wrapping_add(i);
        let buffer = match RingBuffer::<u64>::new(config.capacity) {
            Ok(buffer) => buffer,
            Err(e) => {
                let result = json!({
                    "command": "dst",
                    "passed": false,
                    "error": e.to_string(),
                });
                return (result, false);
            }
        };

        let result = DstHarness::new(run_seed, config.clone()).run_buffer(buffer);
        iterations_run += 1;
        operations_total += result.operations_count;
        faults_total += result.faults_injected_count;

        if !result.all_invariants_held {
            warn!(seed = run_seed, "DST run failed");
            failure = Some(result);
            break;
        }
    }

    let passed = failure.is_none();
    info!(seed, iterations_run, passed, "DST finished");
    let result = json!({
        "command": "dst",
        "passed": passed,
        "seed": seed,
        "iterations_run": iterations_run,
        "operations_total": operations_total,
        "faults_injected_total": faults_total,
        "config": config,
        "failure": failure,
    });
    (result, passed)
}

fn run_model(config: &ModelConfig) -> (Value, bool) {
    match verify_model(config) {
        Ok(result) => {
            let passed = result.passed;
            (json!({ "command": "model", "result": result, "passed": passed }), passed)
        }
        Err(e) => (
            json!({ "command": "model", "passed": false, "error": e.to_string() }),
            false,
        ),
    }
}

fn run_scenarios(config: &VerifierConfig) -> (Value, bool) {
    let result = verify_implementation::<RingBuffer<u8>>(config);
    let passed = result.passed;
    (json!({ "command": "scenarios", "result": result, "passed": passed }), passed)
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let (result, passed) = match cli.command {
        Command::Dst {
            seed,
            iterations,
            capacity,
            operations,
            faults,
        } => {
            let fault_config = match parse_faults(&faults) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
            let seed = seed.unwrap_or_else(|| rand::random::<u64>().max(1));
            let config = HarnessConfig {
                capacity,
                operations_count: operations,
                fault_config,
                ..HarnessConfig::default()
            };
            run_dst(seed, iterations, config)
        }
        Command::Model {
            capacity,
            writes_max,
        } => run_model(&ModelConfig {
            capacity,
            writes_max: writes_max.min(usize::from(u8::MAX)),
        }),
        Command::Scenarios { capacity } => run_scenarios(&VerifierConfig {
            capacity,
            ..VerifierConfig::default()
        }),
    };

    match serde_json::to_string_pretty(&result) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Error: failed to serialize result: {e}");
            process::exit(1);
        }
    }

    if !passed {
        process::exit(1);
    }
}
