//! Script bindings exposed to arena strategies each turn.

use std::cell::Cell;
use std::rc::Rc;

use super::stage::Combatant;
use crate::script::{CsContext, CsRecord, CsValue, NativeFunction};

/// What the party does on a turn. The last action requested by the
/// strategy wins; `Attack` if it requests none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Every living member hits the boss.
    #[default]
    Attack,
    /// Halve the damage taken from the boss this turn.
    Guard,
    /// Heal the weakest living member.
    Heal,
    /// Stop the stage and exclude the run.
    Exclude,
}

fn actor_record(actor: &Combatant) -> CsValue {
    CsValue::object(
        CsRecord::new("actor")
            .with("hp", actor.hp as f64)
            .with("max_hp", actor.max_hp as f64)
            .with("hp_ratio", actor.hp_ratio())
            .with("attack", actor.attack as f64)
            .with("defense", actor.defense as f64)
            .with("alive", actor.is_alive()),
    )
}

fn party_record(party: &[Combatant]) -> CsValue {
    let hp: i64 = party.iter().map(|a| a.hp.max(0)).sum();
    let max_hp: i64 = party.iter().map(|a| a.max_hp).sum();
    let alive = party.iter().filter(|a| a.is_alive()).count();
    CsValue::object(
        CsRecord::new("party")
            .with("hp", hp as f64)
            .with("max_hp", max_hp as f64)
            .with("hp_ratio", hp as f64 / max_hp.max(1) as f64)
            .with("alive", alive as f64)
            .with("size", party.len() as f64),
    )
}

fn action_native(name: &'static str, action: Action, plan: &Rc<Cell<Action>>) -> CsValue {
    let plan = Rc::clone(plan);
    CsValue::object(NativeFunction::new(name, 0, move |_| {
        plan.set(action);
        Ok(CsValue::Boolean(true))
    }))
}

/// Bind this turn's state and action callables into `context`.
///
/// `leader` and `weakest` fall back to the first member when the whole
/// party is down, which cannot happen while a turn is still being played.
pub(super) fn bind_turn(
    context: &mut CsContext,
    turn: u32,
    boss: &Combatant,
    party: &[Combatant],
    plan: &Rc<Cell<Action>>,
) {
    let leader = party.iter().find(|a| a.is_alive()).unwrap_or(&party[0]);
    let weakest = party
        .iter()
        .filter(|a| a.is_alive())
        .min_by(|a, b| a.hp_ratio().total_cmp(&b.hp_ratio()))
        .unwrap_or(leader);

    context.set("turn", CsValue::from(turn));
    context.set("boss", actor_record(boss));
    context.set("party", party_record(party));
    context.set("leader", actor_record(leader));
    context.set("weakest", actor_record(weakest));
    context.set("attack", action_native("attack", Action::Attack, plan));
    context.set("guard", action_native("guard", Action::Guard, plan));
    context.set("heal", action_native("heal", Action::Heal, plan));
    context.set("exclude", action_native("exclude", Action::Exclude, plan));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ActorSpec;
    use crate::script::{Expression, ScriptError};

    fn combatants() -> (Combatant, Vec<Combatant>) {
        let boss = Combatant::from_spec(&ActorSpec::new("Dummy", 1000, 50, 5));
        let mut party = vec![
            Combatant::from_spec(&ActorSpec::new("Karen", 400, 80, 10)),
            Combatant::from_spec(&ActorSpec::new("Hikari", 500, 90, 10)),
        ];
        party[1].hp = 100;
        (boss, party)
    }

    #[test]
    fn test_bindings_expose_state() {
        let (boss, party) = combatants();
        let plan = Rc::new(Cell::new(Action::default()));
        let mut context = CsContext::new();
        bind_turn(&mut context, 4, &boss, &party, &plan);

        let eval = |src: Expression| src.evaluate(&context).unwrap();
        assert_eq!(eval(Expression::ident("turn")), CsValue::Number(4.0));
        assert_eq!(
            eval(Expression::ident("boss").attr("hp")),
            CsValue::Number(1000.0)
        );
        assert_eq!(
            eval(Expression::ident("weakest").attr("hp_ratio")),
            CsValue::Number(0.2)
        );
        assert_eq!(
            eval(Expression::ident("party").attr("alive")),
            CsValue::Number(2.0)
        );
        assert_eq!(
            eval(Expression::ident("leader").attr("alive")),
            CsValue::Boolean(true)
        );
    }

    #[test]
    fn test_last_action_wins() {
        let (boss, party) = combatants();
        let plan = Rc::new(Cell::new(Action::default()));
        let mut context = CsContext::new();
        bind_turn(&mut context, 1, &boss, &party, &plan);

        Expression::ident("guard")
            .call(Vec::new())
            .evaluate(&context)
            .unwrap();
        Expression::ident("heal")
            .call(Vec::new())
            .evaluate(&context)
            .unwrap();
        assert_eq!(plan.get(), Action::Heal);
    }

    #[test]
    fn test_action_takes_no_arguments() {
        let (boss, party) = combatants();
        let plan = Rc::new(Cell::new(Action::default()));
        let mut context = CsContext::new();
        bind_turn(&mut context, 1, &boss, &party, &plan);

        let result = Expression::ident("heal")
            .call(vec![Expression::number(1.0)])
            .evaluate(&context);
        assert!(matches!(result, Err(ScriptError::Arity { .. })));
        assert_eq!(plan.get(), Action::Attack);
    }
}
