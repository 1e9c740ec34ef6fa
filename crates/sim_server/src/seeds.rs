//! Seed scheduling.
//!
//! All iteration seeds of a job come from one generator seeded with the
//! master seed, drawn in index order on a single thread. The seed an
//! iteration plays with therefore never depends on how many workers run it.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One scheduled iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationSeed {
    /// Iteration index, starting at 0.
    pub index: u32,
    /// Stage seed for this iteration.
    pub seed: u64,
}

/// Deterministic `(index, seed)` sequence for a master seed.
#[derive(Debug, Clone)]
pub struct SeedSchedule {
    rng: ChaCha8Rng,
    next: u32,
    count: u32,
}

impl SeedSchedule {
    /// Schedule `count` iterations from `master_seed`.
    #[must_use]
    pub fn new(master_seed: u64, count: u32) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(master_seed),
            next: 0,
            count,
        }
    }

    /// Number of iterations scheduled in total.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Iterator for SeedSchedule {
    type Item = IterationSeed;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let item = IterationSeed {
            index: self.next,
            seed: self.rng.next_u64(),
        };
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SeedSchedule {}

/// Stage seed of a single-iteration job.
///
/// Equal to the seed of iteration 0 of a many-iteration job with the same
/// master seed.
#[must_use]
pub fn single_iteration_seed(master_seed: u64) -> u64 {
    ChaCha8Rng::seed_from_u64(master_seed).next_u64()
}
