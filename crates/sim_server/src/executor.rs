//! Parallel iteration executor.
//!
//! Iterations are split into chunks and each chunk runs sequentially as one
//! task on a fixed rayon pool. Results go out on a bounded channel; a worker
//! blocks when the channel is full, so memory stays bounded no matter how
//! far the workers run ahead of the aggregator.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use sim_core::error::PlayError;
use sim_core::stage::{Loadout, Stage, StageConfiguration, StageResult};
use tracing::{debug, trace};

use crate::seeds::{IterationSeed, SeedSchedule};

/// Outcome of one played iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationResult {
    /// Iteration index.
    pub index: u32,
    /// Seed the stage was created with.
    pub seed: u64,
    /// Stage outcome.
    pub result: StageResult,
}

/// Fixed-size pool shared by every job of a simulator.
#[derive(Debug)]
pub struct WorkerPool {
    pool: ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Start a pool with `workers` threads (at least one).
    pub fn new(workers: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sim-worker-{i}"))
            .build()?;
        Ok(Self { pool, workers })
    }

    /// Number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Schedule every iteration of `schedule` and return immediately.
    ///
    /// Seeds are drawn here, on the calling thread, before any task starts.
    /// Each chunk task owns a clone of `sender`; once every task has
    /// finished the channel disconnects.
    pub fn dispatch<L>(
        &self,
        loadout: &Arc<L>,
        schedule: SeedSchedule,
        max_turns: u32,
        chunk_size: usize,
        sender: SyncSender<IterationResult>,
    ) where
        L: Loadout + 'static,
    {
        let seeds: Vec<IterationSeed> = schedule.collect();
        let chunk_size = chunk_size.max(1);
        debug!(
            iterations = seeds.len(),
            chunk_size,
            workers = self.workers,
            "Dispatching iterations"
        );

        for chunk in seeds.chunks(chunk_size) {
            let chunk = chunk.to_vec();
            let loadout = Arc::clone(loadout);
            let sender = sender.clone();
            self.pool
                .spawn(move || run_chunk(loadout.as_ref(), &chunk, max_turns, &sender));
        }
    }
}

fn run_chunk<L: Loadout>(
    loadout: &L,
    chunk: &[IterationSeed],
    max_turns: u32,
    sender: &SyncSender<IterationResult>,
) {
    for item in chunk {
        let result = play_iteration(loadout, item.seed, max_turns);
        let sent = sender.send(IterationResult {
            index: item.index,
            seed: item.seed,
            result,
        });
        if sent.is_err() {
            trace!(index = item.index, "Result receiver gone, abandoning chunk");
            return;
        }
    }
}

/// Play one quiet iteration. A panic inside the engine becomes
/// [`PlayError::Panicked`].
pub fn play_iteration<L: Loadout>(loadout: &L, seed: u64, max_turns: u32) -> StageResult {
    panic::catch_unwind(AssertUnwindSafe(|| {
        loadout
            .create(seed, StageConfiguration::quiet())
            .play(max_turns)
    }))
    .unwrap_or_else(|payload| StageResult::PlayError(PlayError::Panicked(panic_message(&*payload))))
}

/// Replay one iteration with logging enabled.
pub fn play_logged<L: Loadout>(loadout: &L, seed: u64, max_turns: u32) -> (StageResult, String) {
    panic::catch_unwind(AssertUnwindSafe(|| {
        let mut stage = loadout.create(seed, StageConfiguration::logged());
        let result = stage.play(max_turns);
        (result, stage.log())
    }))
    .unwrap_or_else(|payload| {
        let message = panic_message(&*payload);
        let log = format!("Stage panicked: {message}\n");
        (StageResult::PlayError(PlayError::Panicked(message)), log)
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
