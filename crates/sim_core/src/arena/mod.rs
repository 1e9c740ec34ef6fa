//! Reference combat engine: a party fighting a single boss.
//!
//! The arena exists so the orchestrator and the strategy interpreter can be
//! exercised end to end. It models no real game content. Balance numbers are
//! arbitrary and only need to be deterministic for a given seed.
//!
//! Loadouts are plain data, usually loaded from RON:
//!
//! ```ron
//! (
//!     name: "Sparring",
//!     party: [(name: "Karen", hp: 900, attack: 120, defense: 20)],
//!     boss: (name: "Dummy", hp: 1500, attack: 90, defense: 10),
//!     strategy: None,
//! )
//! ```

mod bindings;
mod stage;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ArenaError, SetupError};
use crate::script::CsScript;
use crate::stage::{Loadout, LoadoutFactory, StageConfiguration};

pub use bindings::Action;
pub use stage::ArenaStage;

/// Stats for one combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSpec {
    /// Display name, unique within the party.
    pub name: String,
    /// Starting and maximum hit points.
    pub hp: u32,
    /// Base damage per hit.
    pub attack: u32,
    /// Flat damage reduction.
    #[serde(default)]
    pub defense: u32,
}

impl ActorSpec {
    /// Create an actor.
    pub fn new(name: impl Into<String>, hp: u32, attack: u32, defense: u32) -> Self {
        Self {
            name: name.into(),
            hp,
            attack,
            defense,
        }
    }
}

/// Unvalidated arena loadout data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaSpec {
    /// Loadout name, used in logs.
    pub name: String,
    /// Party members in formation order. The first living member leads.
    pub party: Vec<ActorSpec>,
    /// The opponent.
    pub boss: ActorSpec,
    /// Turn strategy. Without one the party always attacks.
    #[serde(default)]
    pub strategy: Option<CsScript>,
}

impl ArenaSpec {
    /// Create an arena without a strategy.
    pub fn new(name: impl Into<String>, party: Vec<ActorSpec>, boss: ActorSpec) -> Self {
        Self {
            name: name.into(),
            party,
            boss,
            strategy: None,
        }
    }

    /// Attach a strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: CsScript) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Load an arena from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArenaError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ArenaError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ArenaError> {
        let spec: ArenaSpec = ron::from_str(ron)?;
        Ok(spec)
    }

    /// Validate and freeze into a loadout.
    pub fn build(&self) -> Result<ArenaLoadout, ArenaError> {
        if self.party.is_empty() {
            return Err(ArenaError::EmptyParty);
        }

        let mut names = HashSet::new();
        for actor in self.party.iter().chain(std::iter::once(&self.boss)) {
            if actor.hp == 0 {
                return Err(ArenaError::NonPositiveHp(actor.name.clone()));
            }
        }
        for actor in &self.party {
            if !names.insert(actor.name.as_str()) {
                return Err(ArenaError::DuplicateActor(actor.name.clone()));
            }
        }

        Ok(ArenaLoadout {
            spec: Arc::new(self.clone()),
        })
    }
}

impl LoadoutFactory for ArenaSpec {
    type Loadout = ArenaLoadout;

    fn create_loadout(&self) -> Result<ArenaLoadout, SetupError> {
        Ok(self.build()?)
    }
}

/// Validated arena loadout.
#[derive(Debug, Clone)]
pub struct ArenaLoadout {
    spec: Arc<ArenaSpec>,
}

impl Loadout for ArenaLoadout {
    type Stage = ArenaStage;

    fn create(&self, seed: u64, config: StageConfiguration) -> ArenaStage {
        ArenaStage::new(Arc::clone(&self.spec), seed, config)
    }
}
