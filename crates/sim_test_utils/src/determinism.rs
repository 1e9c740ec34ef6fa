//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a job produces identical results
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! Simulation jobs must be reproducible from their master seed alone.
//! Sources of non-determinism include:
//!
//! - **Scheduling**: workers finish iterations in any order. Seeds are
//!   assigned by index before dispatch and the representative run is chosen
//!   by a total order, so arrival order must never show in a result.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Histograms are kept in a `BTreeMap`.
//!
//! - **System randomness**: only job tokens use `thread_rng`. Every stage
//!   owns a PRNG seeded from its iteration seed.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: seed schedule, selector, interpreter
//! 2. **Property tests**: random master seeds and pool sizes
//! 3. **Integration tests**: full jobs through the simulator

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic job).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run `run` once per entry of `variants` and compare the hashed results.
///
/// `variants` is typically a list of worker counts, so the same job is
/// checked under different degrees of parallelism.
///
/// # Example
///
/// ```ignore
/// use sim_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(&[1, 2, 4], |workers| {
///     let sim = simulator_with(*workers);
///     let token = sim.submit(parameters());
///     sim.wait(&token).unwrap().histogram.clone()
/// });
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<V, T, Run>(variants: &[V], run: Run) -> DeterminismResult
where
    T: Hash,
    Run: Fn(&V) -> T,
{
    let hashes: Vec<u64> = variants.iter().map(|variant| compute_hash(&run(variant))).collect();
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
    }
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
pub mod strategies {
    use proptest::prelude::*;

    /// Any master seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Worker pool size between 1 and 8.
    pub fn arb_worker_count() -> impl Strategy<Value = usize> {
        1usize..=8
    }

    /// Iteration count for a many-iteration job.
    pub fn arb_iterations() -> impl Strategy<Value = u32> {
        2u32..400
    }

    /// Chunk size, including degenerate single-item chunks.
    pub fn arb_chunk_size() -> impl Strategy<Value = usize> {
        1usize..64
    }
}
