//! Job registry: token allocation and snapshot storage.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::result::SimulationResult;

/// Length of a job token.
pub const TOKEN_LENGTH: usize = 32;

/// Opaque handle to a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobToken(String);

impl JobToken {
    fn generate() -> Self {
        let token = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        Self(token)
    }

    /// Token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// Completion flag shared by a job thread and any number of waiters.
#[derive(Debug, Default)]
struct Completion {
    finished: Mutex<bool>,
    signal: Condvar,
}

impl Completion {
    fn is_finished(&self) -> bool {
        *self.finished.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self) {
        *self.finished.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.signal.notify_all();
    }

    fn wait(&self) {
        let mut finished = self.finished.lock().unwrap_or_else(PoisonError::into_inner);
        while !*finished {
            finished = self
                .signal
                .wait(finished)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Held by the thread running a job. Dropping it marks the job finished.
///
/// If the job never published a final snapshot, because it panicked or its
/// thread never started, the guard publishes one before waking waiters.
#[derive(Debug)]
pub struct JobGuard {
    registry: Arc<JobRegistry>,
    token: JobToken,
    completion: Arc<Completion>,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if let Some(last) = self.registry.lookup(&self.token) {
            if !last.is_final() {
                let replacement = if std::thread::panicking() {
                    error!(token = %self.token, "Job thread panicked");
                    (*last).clone().with_error("job thread panicked".to_string())
                } else {
                    error!(token = %self.token, "Job stopped without a final snapshot");
                    SimulationResult {
                        cancelled: true,
                        ..(*last).clone()
                    }
                    .with_error("job stopped before publishing a result".to_string())
                };
                self.registry.publish(&self.token, replacement);
            }
        }
        self.completion.finish();
    }
}

/// Snapshots and job completion flags, keyed by token.
///
/// Snapshots are replaced wholesale, so a reader always sees either the
/// previous or the current snapshot of a job.
#[derive(Debug, Default)]
pub struct JobRegistry {
    results: RwLock<HashMap<JobToken, Arc<SimulationResult>>>,
    jobs: Mutex<HashMap<JobToken, Arc<Completion>>>,
}

impl JobRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh token and publish its zero-progress snapshot.
    pub fn allocate(&self, max_iterations: u32) -> JobToken {
        let mut results = self.results.write().unwrap_or_else(PoisonError::into_inner);
        let mut token = JobToken::generate();
        while results.contains_key(&token) {
            token = JobToken::generate();
        }
        results.insert(token.clone(), Arc::new(SimulationResult::pending(max_iterations)));
        token
    }

    /// Replace the snapshot for `token`.
    pub fn publish(&self, token: &JobToken, result: SimulationResult) {
        self.results
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone(), Arc::new(result));
    }

    /// Current snapshot for `token`.
    #[must_use]
    pub fn lookup(&self, token: &JobToken) -> Option<Arc<SimulationResult>> {
        self.results
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
    }

    /// Mark `token` as running until the returned guard is dropped.
    ///
    /// Move the guard into the job thread and drop it after the job's last
    /// publish.
    pub fn begin(self: &Arc<Self>, token: &JobToken) -> JobGuard {
        let completion = Arc::new(Completion::default());
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone(), Arc::clone(&completion));
        JobGuard {
            registry: Arc::clone(self),
            token: token.clone(),
            completion,
        }
    }

    fn completion(&self, token: &JobToken) -> Option<Arc<Completion>> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
    }

    /// Whether the job is still running.
    #[must_use]
    pub fn is_running(&self, token: &JobToken) -> bool {
        self.completion(token)
            .is_some_and(|completion| !completion.is_finished())
    }

    /// Block until the job finishes and return its final snapshot.
    ///
    /// Any number of callers may wait on the same token; each sees the
    /// final snapshot.
    pub fn wait(&self, token: &JobToken) -> Option<Arc<SimulationResult>> {
        if let Some(completion) = self.completion(token) {
            completion.wait();
        }
        self.lookup(token)
    }

    /// Every token allocated so far.
    #[must_use]
    pub fn tokens(&self) -> Vec<JobToken> {
        let mut tokens: Vec<JobToken> = self
            .results
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        tokens.sort();
        tokens
    }
}
