//! # Sim Server
//!
//! Orchestrates Monte Carlo simulation jobs over any engine implementing
//! the `sim_core` stage contract.
//!
//! A job plays one stage per iteration, each with its own seed, on a fixed
//! worker pool. Results stream through a bounded channel into a single
//! aggregator that builds an outcome histogram, picks the most reportable
//! iteration and replays it with logging. Callers only ever see immutable
//! [`SimulationResult`] snapshots looked up by [`JobToken`].
//!
//! ## Crate Structure
//!
//! - [`simulator`] - Facade owning the registry and worker pool
//! - [`registry`] - Tokens, snapshots and in-flight job handles
//! - [`seeds`] - Deterministic per-iteration seed schedule
//! - [`executor`] - Chunked parallel execution on a rayon pool
//! - [`aggregator`] - Histogram, representative selection, final replay
//! - [`result`] - Snapshot types
//! - [`parameters`] - Job parameters
//! - [`config`] - Tuning knobs loaded from RON
//!
//! # Example
//!
//! ```no_run
//! use sim_core::arena::ArenaSpec;
//! use sim_server::{SimulationParameters, Simulator, SimulatorConfig};
//!
//! let spec = ArenaSpec::load("loadouts/duel.ron")?;
//! let simulator = Simulator::new(SimulatorConfig::default())?;
//! let token = simulator.submit(SimulationParameters::new(spec).with_iterations(10_000));
//!
//! if let Some(result) = simulator.wait(&token) {
//!     println!("{:?}", result.histogram);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod aggregator;
pub mod config;
pub mod executor;
pub mod parameters;
pub mod registry;
pub mod result;
pub mod seeds;
pub mod simulator;

pub use aggregator::{severity_rank, Aggregator, RepresentativeSelector, Shortfall};
pub use config::{ConfigError, SimulatorConfig};
pub use executor::{IterationResult, WorkerPool};
pub use parameters::SimulationParameters;
pub use registry::{JobRegistry, JobToken};
pub use result::{HistogramEntry, OutcomeKind, SimulationResult};
pub use seeds::{single_iteration_seed, IterationSeed, SeedSchedule};
pub use simulator::Simulator;
