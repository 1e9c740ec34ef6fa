//! Interpreter and arena benchmarks for sim_core.
//!
//! Run with: `cargo bench -p sim_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sim_core::prelude::*;
use sim_core::script::ArithmeticOperator;

fn threshold_script() -> Statement {
    Statement::switch(vec![
        CaseClause::Match {
            conditions: vec![Expression::less(
                Expression::ident("hp"),
                Expression::arithmetic(
                    ArithmeticOperator::Multiply,
                    Expression::ident("max_hp"),
                    Expression::number(0.35),
                ),
            )],
            body: Statement::assign("action", Expression::number(1.0)),
        },
        CaseClause::Default {
            body: Statement::assign("action", Expression::number(0.0)),
        },
    ])
}

/// Runs interpreter benchmarks for the sim_core crate.
pub fn interpreter_benchmark(c: &mut Criterion) {
    let script = threshold_script();
    let base = CsContext::with_bindings([
        ("hp", CsValue::Number(300.0)),
        ("max_hp", CsValue::Number(1000.0)),
    ]);

    c.bench_function("switch_turn", |b| {
        b.iter(|| {
            let mut context = base.clone();
            script.execute(black_box(&mut context)).unwrap();
            black_box(context.get("action").unwrap())
        })
    });
}

/// Plays full arena stages.
pub fn arena_benchmark(c: &mut Criterion) {
    let spec = ArenaSpec::from_ron_str(include_str!("../../../loadouts/duel.ron")).unwrap();
    let loadout = spec.build().unwrap();

    let mut seed = 0u64;
    c.bench_function("arena_stage", |b| {
        b.iter(|| {
            seed = seed.wrapping_add(1);
            black_box(loadout.create(seed, StageConfiguration::quiet()).play(30))
        })
    });
}

criterion_group!(benches, interpreter_benchmark, arena_benchmark);
criterion_main!(benches);
