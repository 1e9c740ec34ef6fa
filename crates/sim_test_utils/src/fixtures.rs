//! Test fixtures and helpers.
//!
//! Loadouts whose outcomes are a pure function of the stage seed, so
//! orchestrator tests can predict every histogram without a real engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sim_core::arena::{ActorSpec, ArenaSpec};
use sim_core::error::{PlayError, SetupError};
use sim_core::script::{CaseClause, CsScript, Expression, Statement};
use sim_core::stage::{Loadout, LoadoutFactory, Stage, StageConfiguration, StageResult};

/// Outcome every scripted stage produces for `seed`.
///
/// Roughly 10% excluded, 40% victories, 20% timeouts, 20% wipes and 10%
/// engine errors.
#[must_use]
pub fn outcome_from_seed(seed: u64) -> StageResult {
    let turn = (seed / 10 % 30) as u32 + 1;
    match seed % 10 {
        0 => StageResult::Excluded,
        1..=4 => StageResult::Victory { turn },
        5 | 6 => StageResult::OutOfTurns,
        7 | 8 => StageResult::TeamWipe { turn },
        _ => StageResult::PlayError(PlayError::Engine(format!(
            "scripted failure for seed {seed}"
        ))),
    }
}

/// Loadout whose stages replay [`outcome_from_seed`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedLoadout {
    plays: Option<Arc<AtomicUsize>>,
    panic_on: Option<u64>,
}

impl ScriptedLoadout {
    /// Create a loadout that never panics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every stage play in `plays`.
    #[must_use]
    pub fn with_counter(mut self, plays: Arc<AtomicUsize>) -> Self {
        self.plays = Some(plays);
        self
    }

    /// Panic when a stage with `seed` is played.
    #[must_use]
    pub fn panicking_on(mut self, seed: u64) -> Self {
        self.panic_on = Some(seed);
        self
    }
}

impl Loadout for ScriptedLoadout {
    type Stage = ScriptedStage;

    fn create(&self, seed: u64, config: StageConfiguration) -> ScriptedStage {
        ScriptedStage {
            seed,
            logging: config.logging,
            log: String::new(),
            plays: self.plays.clone(),
            panics: self.panic_on == Some(seed),
        }
    }
}

/// Stage created by [`ScriptedLoadout`].
#[derive(Debug)]
pub struct ScriptedStage {
    seed: u64,
    logging: bool,
    log: String,
    plays: Option<Arc<AtomicUsize>>,
    panics: bool,
}

impl Stage for ScriptedStage {
    fn play(&mut self, _max_turns: u32) -> StageResult {
        if let Some(plays) = &self.plays {
            plays.fetch_add(1, Ordering::SeqCst);
        }
        if self.panics {
            panic!("scripted panic for seed {}", self.seed);
        }

        let result = outcome_from_seed(self.seed);
        if self.logging {
            self.log = format!("Scripted stage for seed {}\nOutcome: {result:?}\n", self.seed);
        }
        result
    }

    fn log(&self) -> String {
        self.log.clone()
    }
}

/// Factory that always builds a [`ScriptedLoadout`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedFactory {
    loadout: ScriptedLoadout,
}

impl ScriptedFactory {
    /// Factory for a plain scripted loadout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory for a configured scripted loadout.
    #[must_use]
    pub fn with_loadout(loadout: ScriptedLoadout) -> Self {
        Self { loadout }
    }
}

impl LoadoutFactory for ScriptedFactory {
    type Loadout = ScriptedLoadout;

    fn create_loadout(&self) -> Result<ScriptedLoadout, SetupError> {
        Ok(self.loadout.clone())
    }
}

/// Factory whose setup always fails.
#[derive(Debug, Clone)]
pub struct FailingFactory {
    message: String,
}

impl FailingFactory {
    /// Fail with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl LoadoutFactory for FailingFactory {
    type Loadout = ScriptedLoadout;

    fn create_loadout(&self) -> Result<ScriptedLoadout, SetupError> {
        Err(SetupError::InvalidLoadout(self.message.clone()))
    }
}

/// Small two-member party against a boss, attacking every turn except when
/// the weakest member drops below 30% hp.
#[must_use]
pub fn duel_spec() -> ArenaSpec {
    let strategy = CsScript::new(Statement::switch(vec![
        CaseClause::Match {
            conditions: vec![Expression::less(
                Expression::ident("weakest").attr("hp_ratio"),
                Expression::number(0.3),
            )],
            body: Statement::call("heal"),
        },
        CaseClause::Default {
            body: Statement::call("attack"),
        },
    ]));

    ArenaSpec::new(
        "Fixture Duel",
        vec![
            ActorSpec::new("Claudine", 900, 140, 20),
            ActorSpec::new("Maya", 1000, 150, 25),
        ],
        ActorSpec::new("Giraffe", 3000, 180, 30),
    )
    .with_strategy(strategy)
}
