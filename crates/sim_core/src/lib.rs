//! # Sim Core
//!
//! Deterministic combat core for the stage simulator.
//!
//! This crate contains **only** deterministic logic:
//! - No IO beyond loading loadout data files
//! - No system randomness (every stage owns a seeded PRNG)
//! - No threads
//!
//! The orchestrator in `sim_server` drives this crate through the
//! [`stage`] contract, which keeps it independent of any particular
//! combat engine.
//!
//! ## Crate Structure
//!
//! - [`script`] - Strategy interpreter: object model, context, syntax tree
//! - [`stage`] - Contract between the orchestrator and a combat engine
//! - [`arena`] - Small reference engine implementing the stage contract
//! - [`error`] - Engine and setup error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod arena;
pub mod error;
pub mod script;
pub mod stage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::arena::{ActorSpec, ArenaLoadout, ArenaSpec, ArenaStage};
    pub use crate::error::{diagnostic, ArenaError, PlayError, SetupError};
    pub use crate::script::{
        CaseClause, CsContext, CsObject, CsRecord, CsScript, CsValue, Expression, Literal,
        NativeFunction, ScriptError, Statement,
    };
    pub use crate::stage::{Loadout, LoadoutFactory, Stage, StageConfiguration, StageResult};
}
