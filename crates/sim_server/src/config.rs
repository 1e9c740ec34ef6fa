//! Orchestrator configuration.
//!
//! Every value here is a tuning knob. None of them affect which seed an
//! iteration receives or which run is selected for the representative log,
//! so results are identical under any configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found.
    #[error("Config file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Failed to start the worker pool.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Configuration for a [`Simulator`](crate::simulator::Simulator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Fixed worker count. `None` sizes the pool from the host.
    pub workers: Option<usize>,
    /// Cores left free when sizing the pool from the host.
    pub worker_reserve: usize,
    /// Iterations per worker task.
    pub chunk_size: usize,
    /// Bound on finished-but-unconsumed iteration results.
    pub channel_capacity: usize,
    /// Publish a progress snapshot every this many results.
    pub update_interval: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            workers: None,
            worker_reserve: 2,
            chunk_size: 10_000,
            channel_capacity: 10_000,
            update_interval: 10_000,
        }
    }
}

impl SimulatorConfig {
    /// Load a config from a RON file. Missing fields take defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ConfigError> {
        let config: SimulatorConfig = ron::from_str(ron)?;
        Ok(config)
    }

    /// Use a fixed number of workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set iterations per worker task.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the result channel bound.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the progress snapshot interval.
    pub fn with_update_interval(mut self, interval: u32) -> Self {
        self.update_interval = interval;
        self
    }

    /// Worker pool size: the fixed count, or host parallelism minus the
    /// reserve. Never less than one.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|p| p.get())
                    .unwrap_or(1)
                    .saturating_sub(self.worker_reserve)
            })
            .max(1)
    }
}
