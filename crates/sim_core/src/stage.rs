//! Contract between the simulation orchestrator and a combat engine.
//!
//! The orchestrator knows nothing about actors, skills or turn resolution.
//! It only needs to build a [`Loadout`] once per job, create one seeded
//! [`Stage`] per iteration and play it to a [`StageResult`].

use serde::{Deserialize, Serialize};

use crate::error::{PlayError, SetupError};

/// Per-stage options chosen by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageConfiguration {
    /// Record a human-readable log while playing.
    pub logging: bool,
}

impl StageConfiguration {
    /// Configuration for bulk iterations: no log.
    #[must_use]
    pub const fn quiet() -> Self {
        Self { logging: false }
    }

    /// Configuration for a representative replay: full log.
    #[must_use]
    pub const fn logged() -> Self {
        Self { logging: true }
    }
}

/// Outcome of playing one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageResult {
    /// The run was excluded from consideration by the strategy.
    Excluded,
    /// The enemy was defeated on `turn`.
    Victory {
        /// Turn the stage was won.
        turn: u32,
    },
    /// The turn limit was reached with both sides standing.
    OutOfTurns,
    /// The whole team was defeated on `turn`.
    TeamWipe {
        /// Turn the team fell.
        turn: u32,
    },
    /// Playing failed.
    PlayError(PlayError),
}

impl StageResult {
    /// The play error, if this result is one.
    #[must_use]
    pub fn error(&self) -> Option<&PlayError> {
        match self {
            Self::PlayError(error) => Some(error),
            _ => None,
        }
    }
}

/// One seeded, playable combat simulation.
///
/// A stage is played once; it is not required to be `Send`.
pub trait Stage {
    /// Play up to `max_turns` turns.
    fn play(&mut self, max_turns: u32) -> StageResult;

    /// Text log recorded so far. Empty unless created with logging.
    fn log(&self) -> String;
}

/// A configured team, shared read-only by every worker of a job.
pub trait Loadout: Send + Sync {
    /// Stage type produced by this loadout.
    type Stage: Stage;

    /// Create a stage whose randomness derives only from `seed`.
    fn create(&self, seed: u64, config: StageConfiguration) -> Self::Stage;
}

/// Content layer that builds a [`Loadout`] from job parameters.
pub trait LoadoutFactory: Send + 'static {
    /// Loadout produced by this factory.
    type Loadout: Loadout + 'static;

    /// Build the loadout. Failure cancels the whole job.
    fn create_loadout(&self) -> Result<Self::Loadout, SetupError>;
}
