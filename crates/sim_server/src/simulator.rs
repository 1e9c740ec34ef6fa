//! Simulator facade: submit jobs, look up snapshots.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use sim_core::error::diagnostic;
use sim_core::stage::{LoadoutFactory, StageResult};
use tracing::{debug, error, info, warn};

use crate::aggregator::Aggregator;
use crate::config::{ConfigError, SimulatorConfig};
use crate::executor::{play_logged, WorkerPool};
use crate::parameters::SimulationParameters;
use crate::registry::{JobRegistry, JobToken};
use crate::result::{Histogram, OutcomeKind, SimulationResult};
use crate::seeds::{single_iteration_seed, SeedSchedule};

/// Owns the job registry and the worker pool.
///
/// Dropping a simulator does not stop jobs that were already submitted;
/// they hold their own references to the pool and registry.
#[derive(Debug)]
pub struct Simulator {
    config: SimulatorConfig,
    registry: Arc<JobRegistry>,
    pool: Arc<WorkerPool>,
}

impl Simulator {
    /// Start a simulator and its worker pool.
    pub fn new(config: SimulatorConfig) -> Result<Self, ConfigError> {
        let pool = WorkerPool::new(config.worker_count())?;
        info!(workers = pool.workers(), "Simulator started");
        Ok(Self {
            config,
            registry: Arc::new(JobRegistry::new()),
            pool: Arc::new(pool),
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    /// Shared registry handle.
    #[must_use]
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Start a job and return its token immediately.
    ///
    /// Never fails: any problem starting or running the job shows up in the
    /// token's snapshot.
    pub fn submit<F: LoadoutFactory>(&self, parameters: SimulationParameters<F>) -> JobToken {
        let max_iterations = parameters.max_iterations;
        let token = self.registry.allocate(max_iterations);
        info!(
            token = %token,
            iterations = max_iterations,
            seed = parameters.seed,
            max_turns = parameters.max_turns,
            "Job submitted"
        );

        let guard = self.registry.begin(&token);
        let job = Job {
            token: token.clone(),
            registry: Arc::clone(&self.registry),
            pool: Arc::clone(&self.pool),
            config: self.config.clone(),
            parameters,
        };
        let spawned = thread::Builder::new()
            .name(format!("sim-job-{}", &token.as_str()[..8]))
            .spawn(move || {
                let _guard = guard;
                job.run();
            });

        // A thread that never started drops its guard, which cancels the job.
        if let Err(err) = spawned {
            error!(token = %token, error = %err, "Failed to start job thread");
        }
        token
    }

    /// Current snapshot for `token`.
    #[must_use]
    pub fn lookup(&self, token: &JobToken) -> Option<Arc<SimulationResult>> {
        self.registry.lookup(token)
    }

    /// Block until the job finishes and return its final snapshot.
    pub fn wait(&self, token: &JobToken) -> Option<Arc<SimulationResult>> {
        self.registry.wait(token)
    }
}

struct Job<F> {
    token: JobToken,
    registry: Arc<JobRegistry>,
    pool: Arc<WorkerPool>,
    config: SimulatorConfig,
    parameters: SimulationParameters<F>,
}

impl<F: LoadoutFactory> Job<F> {
    fn run(self) {
        let loadout = match self.parameters.loadout.create_loadout() {
            Ok(loadout) => loadout,
            Err(err) => {
                let message = diagnostic(&err);
                warn!(token = %self.token, error = %message, "Loadout setup failed");
                self.publish(SimulationResult::setup_failed(
                    self.parameters.max_iterations,
                    message,
                ));
                return;
            }
        };

        if self.parameters.max_iterations == 1 {
            self.simulate_single(&loadout);
        } else {
            self.simulate_many(Arc::new(loadout));
        }
    }

    fn publish(&self, result: SimulationResult) {
        self.registry.publish(&self.token, result);
    }

    fn simulate_single(&self, loadout: &F::Loadout) {
        let seed = single_iteration_seed(self.parameters.seed);
        debug!(token = %self.token, seed, "Playing single iteration");

        let (result, log) = play_logged(loadout, seed, self.parameters.max_turns);
        let mut histogram = Histogram::new();
        histogram.record(OutcomeKind::from(&result));

        let mut snapshot = SimulationResult::progress(1, 1, &histogram).with_log(log);
        if let StageResult::PlayError(err) = &result {
            snapshot = snapshot.with_error(diagnostic(err));
        }
        info!(token = %self.token, outcome = ?OutcomeKind::from(&result), "Job finished");
        self.publish(snapshot);
    }

    fn simulate_many(&self, loadout: Arc<F::Loadout>) {
        let iterations = self.parameters.max_iterations;
        let (sender, receiver) = mpsc::sync_channel(self.config.channel_capacity.max(1));

        self.pool.dispatch(
            &loadout,
            SeedSchedule::new(self.parameters.seed, iterations),
            self.parameters.max_turns,
            self.config.chunk_size,
            sender,
        );

        let mut aggregator = Aggregator::new(iterations, self.config.update_interval, |snapshot| {
            self.publish(snapshot);
        });

        match aggregator.consume(&receiver) {
            Ok(()) => {
                let last = aggregator.finish(loadout.as_ref(), self.parameters.max_turns);
                info!(
                    token = %self.token,
                    completed = last.completed_iterations,
                    buckets = last.histogram.len(),
                    "Job finished"
                );
            }
            Err(shortfall) => {
                aggregator.fail(&shortfall);
            }
        }
    }
}
