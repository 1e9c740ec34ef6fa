//! Simulation job runner.
//!
//! Runs a loadout many times and prints the final snapshot as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Run 10k iterations of a loadout
//! cargo run -p sim_server -- run --loadout loadouts/duel.ron --iterations 10000
//!
//! # Check that pool size does not change the result
//! cargo run -p sim_server -- verify --loadout loadouts/duel.ron --iterations 2000
//! ```
//!
//! Output (stdout): final snapshot JSON
//! Logs (stderr): progress and diagnostics

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sim_core::arena::ArenaSpec;
use sim_server::{JobToken, SimulationParameters, SimulationResult, Simulator, SimulatorConfig};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "sim_server")]
#[command(about = "Monte Carlo stage simulator")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation job and print its final snapshot
    Run {
        /// Arena loadout file (RON)
        #[arg(short, long)]
        loadout: PathBuf,

        /// Number of iterations
        #[arg(short, long, default_value = "1000")]
        iterations: u32,

        /// Master seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Turn limit per stage
        #[arg(short, long, default_value = "30")]
        turns: u32,

        /// Worker threads (default: available cores minus reserve)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Simulator config file (RON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Run the same job on pools of different sizes and compare histograms
    Verify {
        /// Arena loadout file (RON)
        #[arg(short, long)]
        loadout: PathBuf,

        /// Number of iterations
        #[arg(short, long, default_value = "1000")]
        iterations: u32,

        /// Master seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Turn limit per stage
        #[arg(short, long, default_value = "30")]
        turns: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for JSON output
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            loadout,
            iterations,
            seed,
            turns,
            workers,
            config,
            pretty,
        } => {
            cmd_run(&loadout, iterations, seed, turns, workers, config, pretty);
        }
        Commands::Verify {
            loadout,
            iterations,
            seed,
            turns,
        } => {
            cmd_verify(&loadout, iterations, seed, turns);
        }
    }
}

fn load_spec(path: &Path) -> ArenaSpec {
    match ArenaSpec::load(path) {
        Ok(spec) => spec,
        Err(e) => {
            error!("Failed to load loadout {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn start_simulator(config: SimulatorConfig) -> Simulator {
    match Simulator::new(config) {
        Ok(simulator) => simulator,
        Err(e) => {
            error!("Failed to start simulator: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_run(
    loadout: &Path,
    iterations: u32,
    seed: u64,
    turns: u32,
    workers: Option<usize>,
    config_path: Option<PathBuf>,
    pretty: bool,
) {
    let mut config = match config_path {
        Some(path) => match SimulatorConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => SimulatorConfig::default(),
    };
    if let Some(workers) = workers {
        config = config.with_workers(workers);
    }

    let spec = load_spec(loadout);
    info!(
        loadout = %spec.name,
        iterations,
        seed,
        turns,
        "Starting simulation"
    );

    let simulator = start_simulator(config);
    info!(
        workers = simulator.workers(),
        chunk_size = simulator.config().chunk_size,
        channel_capacity = simulator.config().channel_capacity,
        "Simulator ready"
    );
    let token = simulator.submit(
        SimulationParameters::new(spec)
            .with_iterations(iterations)
            .with_seed(seed)
            .with_max_turns(turns),
    );

    let result = watch(&simulator, &token);
    if result.cancelled {
        warn!("Job was cancelled during setup");
    }
    if let Some(diagnostic) = &result.error {
        warn!("Job reported an error:\n{}", diagnostic);
    }

    let json = if pretty {
        serde_json::to_string_pretty(result.as_ref())
    } else {
        serde_json::to_string(result.as_ref())
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!("Failed to serialize result: {}", e);
            std::process::exit(1);
        }
    }
}

/// Poll the job until it stops running, logging progress, then join it.
fn watch(simulator: &Simulator, token: &JobToken) -> Arc<SimulationResult> {
    let mut reported = 0;
    while simulator.registry().is_running(token) {
        if let Some(snapshot) = simulator.lookup(token) {
            if snapshot.completed_iterations > reported {
                reported = snapshot.completed_iterations;
                info!(
                    completed = snapshot.completed_iterations,
                    total = snapshot.max_iterations,
                    "Progress: {:.1}%",
                    snapshot.progress_ratio() * 100.0
                );
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    match simulator.wait(token) {
        Some(result) => result,
        None => {
            error!(token = %token, "Job disappeared from the registry");
            std::process::exit(1);
        }
    }
}

fn cmd_verify(loadout: &Path, iterations: u32, seed: u64, turns: u32) {
    let spec = load_spec(loadout);
    let host = SimulatorConfig::default().worker_count();
    let mut pool_sizes = vec![1, 2, host];
    pool_sizes.sort_unstable();
    pool_sizes.dedup();

    let mut results = Vec::with_capacity(pool_sizes.len());
    for workers in &pool_sizes {
        let simulator = start_simulator(SimulatorConfig::default().with_workers(*workers));
        let token = simulator.submit(
            SimulationParameters::new(spec.clone())
                .with_iterations(iterations)
                .with_seed(seed)
                .with_max_turns(turns),
        );
        let result = watch(&simulator, &token);
        info!(
            workers = simulator.workers(),
            buckets = result.histogram.len(),
            "Run complete"
        );
        results.push(result);
    }

    let matches = results
        .windows(2)
        .all(|pair| pair[0].histogram == pair[1].histogram && pair[0].full_log == pair[1].full_log);

    if matches {
        println!("Deterministic across pool sizes {pool_sizes:?}");
    } else {
        error!("Results differ across pool sizes {:?}", pool_sizes);
        std::process::exit(1);
    }
}
