//! Turn resolution for the arena.

use std::cell::Cell;
use std::fmt::Write as _;
use std::rc::Rc;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use super::bindings::{bind_turn, Action};
use super::{ActorSpec, ArenaSpec};
use crate::error::PlayError;
use crate::script::{CsContext, ScriptResult};
use crate::stage::{Stage, StageConfiguration, StageResult};

/// Damage rolls land within this fraction of the attacker's stat.
const DAMAGE_VARIANCE: f64 = 0.15;

/// Fraction of max hp restored by a heal.
const HEAL_FRACTION: f64 = 0.2;

/// Live state of one combatant.
#[derive(Debug, Clone)]
pub(super) struct Combatant {
    pub name: String,
    pub hp: i64,
    pub max_hp: i64,
    pub attack: i64,
    pub defense: i64,
}

impl Combatant {
    pub(super) fn from_spec(spec: &ActorSpec) -> Self {
        Self {
            name: spec.name.clone(),
            hp: i64::from(spec.hp),
            max_hp: i64::from(spec.hp),
            attack: i64::from(spec.attack),
            defense: i64::from(spec.defense),
        }
    }

    pub(super) fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub(super) fn hp_ratio(&self) -> f64 {
        self.hp.max(0) as f64 / self.max_hp as f64
    }
}

/// One seeded arena fight.
#[derive(Debug)]
pub struct ArenaStage {
    spec: Arc<ArenaSpec>,
    rng: ChaCha8Rng,
    party: Vec<Combatant>,
    boss: Combatant,
    logging: bool,
    log: String,
}

impl ArenaStage {
    pub(super) fn new(spec: Arc<ArenaSpec>, seed: u64, config: StageConfiguration) -> Self {
        let party = spec.party.iter().map(Combatant::from_spec).collect();
        let boss = Combatant::from_spec(&spec.boss);
        Self {
            spec,
            rng: ChaCha8Rng::seed_from_u64(seed),
            party,
            boss,
            logging: config.logging,
            log: String::new(),
        }
    }

    fn record(&mut self, line: impl FnOnce() -> String) {
        if self.logging {
            let _ = writeln!(self.log, "{}", line());
        }
    }

    fn party_alive(&self) -> bool {
        self.party.iter().any(Combatant::is_alive)
    }

    fn roll_damage(&mut self, attack: i64, defense: i64) -> i64 {
        let variance = self
            .rng
            .gen_range(1.0 - DAMAGE_VARIANCE..=1.0 + DAMAGE_VARIANCE);
        ((attack as f64 * variance).round() as i64 - defense).max(1)
    }

    /// Run the strategy for this turn and return the requested action.
    fn choose_action(&self, turn: u32, globals: &CsContext) -> ScriptResult<Action> {
        let Some(strategy) = &self.spec.strategy else {
            return Ok(Action::Attack);
        };
        let plan = Rc::new(Cell::new(Action::default()));
        let mut context = globals.clone();
        bind_turn(&mut context, turn, &self.boss, &self.party, &plan);
        strategy.execute(&mut context)?;
        Ok(plan.get())
    }

    fn party_attack(&mut self) {
        for index in 0..self.party.len() {
            if !self.party[index].is_alive() || !self.boss.is_alive() {
                continue;
            }
            let damage = self.roll_damage(self.party[index].attack, self.boss.defense);
            self.boss.hp -= damage;
            let attacker = self.party[index].name.clone();
            let (boss, remaining) = (self.boss.name.clone(), self.boss.hp.max(0));
            self.record(|| format!("  {attacker} hits {boss} for {damage} ({remaining} hp left)"));
        }
    }

    fn party_heal(&mut self) {
        let Some(target) = self
            .party
            .iter_mut()
            .filter(|a| a.is_alive())
            .min_by(|a, b| a.hp_ratio().total_cmp(&b.hp_ratio()))
        else {
            return;
        };
        let amount = (target.max_hp as f64 * HEAL_FRACTION).round() as i64;
        let healed = amount.min(target.max_hp - target.hp);
        target.hp += healed;
        let (name, hp) = (target.name.clone(), target.hp);
        self.record(|| format!("  {name} is healed for {healed} ({hp} hp)"));
    }

    fn boss_attack(&mut self, guarding: bool) {
        let living: Vec<usize> = (0..self.party.len())
            .filter(|&i| self.party[i].is_alive())
            .collect();
        if living.is_empty() {
            return;
        }
        let target = living[self.rng.gen_range(0..living.len())];
        let mut damage = self.roll_damage(self.boss.attack, self.party[target].defense);
        if guarding {
            damage = (damage / 2).max(1);
        }
        self.party[target].hp -= damage;

        let boss = self.boss.name.clone();
        let victim = self.party[target].clone();
        self.record(|| {
            format!(
                "  {boss} hits {} for {damage} ({} hp left)",
                victim.name,
                victim.hp.max(0)
            )
        });
        if !victim.is_alive() {
            self.record(|| format!("  {} falls", victim.name));
        }
    }
}

impl Stage for ArenaStage {
    fn play(&mut self, max_turns: u32) -> StageResult {
        let name = self.spec.name.clone();
        let seats = self.party.len();
        self.record(|| format!("Stage: {name} ({seats} in party)"));

        let spec = Arc::clone(&self.spec);
        let mut globals = CsContext::new();
        if let Some(strategy) = &spec.strategy {
            if let Err(source) = strategy.initialize(&mut globals) {
                self.record(|| format!("Strategy initialization failed: {source}"));
                return StageResult::PlayError(PlayError::Script { turn: 0, source });
            }
        }

        for turn in 1..=max_turns {
            self.record(|| format!("Turn {turn}"));

            let action = match self.choose_action(turn, &globals) {
                Ok(action) => action,
                Err(source) => {
                    self.record(|| format!("  strategy failed: {source}"));
                    return StageResult::PlayError(PlayError::Script { turn, source });
                }
            };
            trace!(turn, ?action, "arena turn");

            match action {
                Action::Exclude => {
                    self.record(|| "  run excluded by strategy".to_string());
                    return StageResult::Excluded;
                }
                Action::Attack => self.party_attack(),
                Action::Heal => self.party_heal(),
                Action::Guard => self.record(|| "  party guards".to_string()),
            }

            if !self.boss.is_alive() {
                let boss = self.boss.name.clone();
                self.record(|| format!("{boss} is defeated on turn {turn}"));
                return StageResult::Victory { turn };
            }

            self.boss_attack(action == Action::Guard);

            if !self.party_alive() {
                self.record(|| format!("Party wiped out on turn {turn}"));
                return StageResult::TeamWipe { turn };
            }
        }

        self.record(|| format!("Out of turns after {max_turns}"));
        StageResult::OutOfTurns
    }

    fn log(&self) -> String {
        self.log.clone()
    }
}
