//! Parameters for one simulation job.

use serde::{Deserialize, Serialize};

/// Default turn limit per stage.
pub const DEFAULT_MAX_TURNS: u32 = 30;

/// Everything needed to run one job.
///
/// `loadout` is any [`LoadoutFactory`](sim_core::stage::LoadoutFactory);
/// the factory runs on the job's own thread, so a failing factory never
/// blocks `submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParameters<F> {
    /// Turn limit for every stage.
    pub max_turns: u32,
    /// Number of iterations. `1` takes the single-run path.
    pub max_iterations: u32,
    /// Master seed.
    pub seed: u64,
    /// Builds the loadout.
    pub loadout: F,
}

impl<F> SimulationParameters<F> {
    /// Create parameters for a single run with seed 0.
    pub fn new(loadout: F) -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            max_iterations: 1,
            seed: 0,
            loadout,
        }
    }

    /// Set the iteration count.
    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Set the master seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the turn limit.
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }
}
