//! Error types for stage play and loadout setup.

use std::error::Error as StdError;
use std::fmt::Write as _;

use thiserror::Error;

use crate::script::ScriptError;

/// Failure while playing a single stage.
///
/// A play error is terminal to one iteration only. The orchestrator records
/// it as an outcome and never retries it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlayError {
    /// The strategy script failed to evaluate.
    #[error("strategy script failed on turn {turn}")]
    Script {
        /// Turn being played when the script failed (0 = initialization).
        turn: u32,
        /// Interpreter error.
        #[source]
        source: ScriptError,
    },

    /// The engine panicked while playing.
    #[error("engine panicked: {0}")]
    Panicked(String),

    /// Engine-specific failure.
    #[error("engine failure: {0}")]
    Engine(String),
}

/// Failure while constructing a loadout. Terminal to the whole job.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The reference arena rejected its loadout data.
    #[error("invalid arena loadout")]
    Arena(#[from] ArenaError),

    /// Any other content-construction failure.
    #[error("invalid loadout: {0}")]
    InvalidLoadout(String),
}

/// Error type for arena loadout operations.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// Loadout file not found.
    #[error("Loadout file not found: {0}")]
    FileNotFound(String),

    /// Failed to read file.
    #[error("Failed to read loadout file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse RON.
    #[error("Failed to parse loadout: {0}")]
    ParseError(#[from] ron::error::SpannedError),

    /// Party has no members.
    #[error("party must contain at least one actor")]
    EmptyParty,

    /// An actor would start the stage already defeated.
    #[error("actor '{0}' must have positive hp")]
    NonPositiveHp(String),

    /// Two party members share a name.
    #[error("duplicate actor name '{0}'")]
    DuplicateActor(String),
}

/// Render an error together with its `source()` chain.
///
/// This is the diagnostic text surfaced to callers in snapshots.
#[must_use]
pub fn diagnostic(error: &dyn StdError) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(text, "\ncaused by: {cause}");
        source = cause.source();
    }
    text
}
