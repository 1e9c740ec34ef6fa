//! Evaluation rules.
//!
//! Evaluation is a plain recursive walk. Operands are evaluated strictly
//! left to right because native calls may have side effects, and `and`/`or`
//! only evaluate their right operand when it decides the result.

use tracing::trace;

use super::ast::{
    CaseClause, ComparisonOperator, CsScript, Expression, LogicalOperator, Statement,
    UnaryOperator,
};
use super::context::CsContext;
use super::error::{ScriptError, ScriptResult};
use super::value::CsValue;

impl CsScript {
    /// Run the initializer, if any, against `context`.
    pub fn initialize(&self, context: &mut CsContext) -> ScriptResult<()> {
        match &self.initialize {
            Some(statement) => statement.execute(context),
            None => Ok(()),
        }
    }

    /// Run the per-turn body against `context`.
    pub fn execute(&self, context: &mut CsContext) -> ScriptResult<()> {
        self.body.execute(context)
    }
}

impl Statement {
    /// Execute this statement.
    pub fn execute(&self, context: &mut CsContext) -> ScriptResult<()> {
        match self {
            Statement::Block(statements) => {
                for statement in statements {
                    statement.execute(context)?;
                }
                Ok(())
            }
            Statement::Assign { name, value } => {
                let value = value.evaluate(context)?;
                trace!(name = %name, value = %value, "assign");
                context.set(name.clone(), value);
                Ok(())
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if condition.evaluate(context)?.to_boolean()? {
                    then_branch.execute(context)
                } else if let Some(else_branch) = else_branch {
                    else_branch.execute(context)
                } else {
                    Ok(())
                }
            }
            Statement::Switch { subject, cases } => {
                let body = select_case(subject.as_ref(), cases, context)?;
                body.execute(context)
            }
            Statement::Expression(expression) => expression.evaluate(context).map(drop),
        }
    }
}

/// Pick the first case, in declaration order, that matches.
///
/// `Default` matches whenever it is reached; it is not a fallback.
fn select_case<'a>(
    subject: Option<&Expression>,
    cases: &'a [CaseClause],
    context: &CsContext,
) -> ScriptResult<&'a Statement> {
    let subject = subject.map(|s| s.evaluate(context)).transpose()?;

    for case in cases {
        let matched = match case {
            CaseClause::Default { .. } => true,
            CaseClause::Match { conditions, .. } => {
                any_condition_matches(conditions, subject.as_ref(), context)?
            }
        };
        if matched {
            return Ok(case.body());
        }
    }

    Err(ScriptError::NoMatchingCase {
        subject: subject.map_or_else(|| "none".to_string(), |s| s.to_string()),
    })
}

fn any_condition_matches(
    conditions: &[Expression],
    subject: Option<&CsValue>,
    context: &CsContext,
) -> ScriptResult<bool> {
    for condition in conditions {
        let value = condition.evaluate(context)?;
        let hit = match subject {
            Some(subject) => value == *subject,
            None => value.to_boolean()?,
        };
        if hit {
            return Ok(true);
        }
    }
    Ok(false)
}

impl Expression {
    /// Evaluate this expression.
    pub fn evaluate(&self, context: &CsContext) -> ScriptResult<CsValue> {
        match self {
            Expression::Identifier(name) => context.get(name),

            Expression::Literal(literal) => Ok(literal.to_value()),

            Expression::Attribute { target, name } => target.evaluate(context)?.get_attribute(name),

            Expression::Call { callee, args } => {
                let callee = callee.evaluate(context)?;
                let args = args
                    .iter()
                    .map(|arg| arg.evaluate(context))
                    .collect::<ScriptResult<Vec<_>>>()?;
                callee.invoke(&args)
            }

            Expression::Unary { op, operand } => {
                let value = operand.evaluate(context)?;
                Ok(match op {
                    UnaryOperator::Plus => CsValue::Number(value.to_number()?),
                    UnaryOperator::Minus => CsValue::Number(-value.to_number()?),
                    UnaryOperator::Not => CsValue::Boolean(!value.to_boolean()?),
                })
            }

            Expression::Arithmetic { op, lhs, rhs } => {
                let l = lhs.evaluate(context)?.to_number()?;
                let r = rhs.evaluate(context)?.to_number()?;
                Ok(CsValue::Number(op.apply(l, r)))
            }

            Expression::Logical { op, lhs, rhs } => {
                let l = lhs.evaluate(context)?.to_boolean()?;
                let result = match op {
                    LogicalOperator::And => l && rhs.evaluate(context)?.to_boolean()?,
                    LogicalOperator::Or => l || rhs.evaluate(context)?.to_boolean()?,
                };
                Ok(CsValue::Boolean(result))
            }

            Expression::Comparison { op, lhs, rhs } => {
                let l = lhs.evaluate(context)?;
                let r = rhs.evaluate(context)?;
                let result = match op {
                    ComparisonOperator::Equal => l == r,
                    ComparisonOperator::NotEqual => l != r,
                    ComparisonOperator::Less => l.to_number()? < r.to_number()?,
                    ComparisonOperator::LessOrEqual => l.to_number()? <= r.to_number()?,
                    ComparisonOperator::Greater => l.to_number()? > r.to_number()?,
                    ComparisonOperator::GreaterOrEqual => l.to_number()? >= r.to_number()?,
                };
                Ok(CsValue::Boolean(result))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use proptest::prelude::*;

    use super::*;
    use crate::script::ast::ArithmeticOperator;
    use crate::script::value::{CsRecord, NativeFunction};

    /// Context with `mark(n)` (returns true) and `echo(n)` (returns n)
    /// natives that both record every call in the returned log.
    fn recording_context() -> (CsContext, Rc<RefCell<Vec<f64>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mark_sink = Rc::clone(&calls);
        let mark = NativeFunction::new("mark", 1, move |args| {
            mark_sink.borrow_mut().push(args[0].to_number()?);
            Ok(CsValue::Boolean(true))
        });
        let echo_sink = Rc::clone(&calls);
        let echo = NativeFunction::new("echo", 1, move |args| {
            let n = args[0].to_number()?;
            echo_sink.borrow_mut().push(n);
            Ok(CsValue::Number(n))
        });
        let context = CsContext::with_bindings([
            ("mark", CsValue::object(mark)),
            ("echo", CsValue::object(echo)),
        ]);
        (context, calls)
    }

    fn mark(n: f64) -> Expression {
        Expression::ident("mark").call(vec![Expression::number(n)])
    }

    fn echo(n: f64) -> Expression {
        Expression::ident("echo").call(vec![Expression::number(n)])
    }

    fn run(statement: &Statement) -> ScriptResult<CsContext> {
        let mut context = CsContext::new();
        statement.execute(&mut context)?;
        Ok(context)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    #[test]
    fn test_arithmetic_uses_both_operands() {
        let context = CsContext::new();
        let cases = [
            (ArithmeticOperator::Add, 9.0),
            (ArithmeticOperator::Subtract, 5.0),
            (ArithmeticOperator::Multiply, 14.0),
            (ArithmeticOperator::Divide, 3.5),
            (ArithmeticOperator::Modulo, 1.0),
        ];

        for (op, expected) in cases {
            let expr =
                Expression::arithmetic(op, Expression::number(7.0), Expression::number(2.0));
            assert_eq!(
                expr.evaluate(&context),
                Ok(CsValue::Number(expected)),
                "{op:?}"
            );
        }
    }

    #[test]
    fn test_comparison_uses_both_operands() {
        let context = CsContext::new();
        let less = Expression::less(Expression::number(1.0), Expression::number(2.0));
        let greater = Expression::compare(
            ComparisonOperator::Greater,
            Expression::number(1.0),
            Expression::number(2.0),
        );
        let not_equal = Expression::compare(
            ComparisonOperator::NotEqual,
            Expression::number(1.0),
            Expression::number(2.0),
        );

        assert_eq!(less.evaluate(&context), Ok(CsValue::Boolean(true)));
        assert_eq!(greater.evaluate(&context), Ok(CsValue::Boolean(false)));
        assert_eq!(not_equal.evaluate(&context), Ok(CsValue::Boolean(true)));
    }

    #[test]
    fn test_ordering_requires_numbers() {
        let context = CsContext::new();
        let expr = Expression::less(Expression::boolean(true), Expression::number(2.0));
        assert_eq!(
            expr.evaluate(&context),
            Err(ScriptError::type_mismatch("number", "boolean"))
        );
    }

    #[test]
    fn test_equality_across_types_is_false() {
        let context = CsContext::new();
        let expr = Expression::equal(Expression::boolean(true), Expression::number(1.0));
        assert_eq!(expr.evaluate(&context), Ok(CsValue::Boolean(false)));
    }

    #[test]
    fn test_unary_operators() {
        let context = CsContext::with_bindings([("x", CsValue::Number(3.0))]);

        let neg = Expression::unary(UnaryOperator::Minus, Expression::ident("x"));
        let pos = Expression::unary(UnaryOperator::Plus, Expression::ident("x"));
        let not = Expression::unary(UnaryOperator::Not, Expression::boolean(false));

        assert_eq!(neg.evaluate(&context), Ok(CsValue::Number(-3.0)));
        assert_eq!(pos.evaluate(&context), Ok(CsValue::Number(3.0)));
        assert_eq!(not.evaluate(&context), Ok(CsValue::Boolean(true)));

        let bad = Expression::unary(UnaryOperator::Not, Expression::ident("x"));
        assert_eq!(
            bad.evaluate(&context),
            Err(ScriptError::type_mismatch("boolean", "number"))
        );
    }

    #[test]
    fn test_attribute_access() {
        let boss = CsRecord::new("actor").with("hp", 250.0);
        let context = CsContext::with_bindings([("boss", CsValue::object(boss))]);

        let hp = Expression::ident("boss").attr("hp");
        assert_eq!(hp.evaluate(&context), Ok(CsValue::Number(250.0)));

        let missing = Expression::ident("boss").attr("mp");
        assert_eq!(
            missing.evaluate(&context),
            Err(ScriptError::attribute("actor", "mp"))
        );
    }

    #[test]
    fn test_undefined_identifier() {
        let context = CsContext::new();
        assert_eq!(
            Expression::ident("boss").evaluate(&context),
            Err(ScriptError::UndefinedName("boss".to_string()))
        );
    }

    #[test]
    fn test_operands_evaluate_left_to_right() {
        let (context, calls) = recording_context();

        let difference =
            Expression::arithmetic(ArithmeticOperator::Subtract, echo(1.0), echo(2.0));
        assert_eq!(difference.evaluate(&context), Ok(CsValue::Number(-1.0)));
        assert_eq!(*calls.borrow(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_comparison_and_call_argument_order() {
        let (context, calls) = recording_context();

        let compare = Expression::equal(mark(1.0), mark(2.0));
        assert_eq!(compare.evaluate(&context), Ok(CsValue::Boolean(true)));

        let sum = NativeFunction::variadic("sum", |args| {
            args.iter()
                .try_fold(0.0, |acc, arg| Ok(acc + arg.to_number()?))
                .map(CsValue::Number)
        });
        let mut context = context;
        context.set("sum", CsValue::object(sum));

        let call = Expression::ident("sum").call(vec![
            Expression::equal(mark(3.0), Expression::boolean(true)),
            Expression::number(1.0),
        ]);
        assert!(call.evaluate(&context).is_err());
        assert_eq!(*calls.borrow(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_and_short_circuits() {
        let (context, calls) = recording_context();

        let expr = Expression::and(Expression::boolean(false), mark(1.0));
        assert_eq!(expr.evaluate(&context), Ok(CsValue::Boolean(false)));
        assert!(calls.borrow().is_empty());

        let expr = Expression::and(Expression::boolean(true), mark(2.0));
        assert_eq!(expr.evaluate(&context), Ok(CsValue::Boolean(true)));
        assert_eq!(*calls.borrow(), vec![2.0]);
    }

    #[test]
    fn test_or_short_circuits() {
        let (context, calls) = recording_context();

        let expr = Expression::or(Expression::boolean(true), mark(1.0));
        assert_eq!(expr.evaluate(&context), Ok(CsValue::Boolean(true)));
        assert!(calls.borrow().is_empty());

        let expr = Expression::or(Expression::boolean(false), mark(2.0));
        assert_eq!(expr.evaluate(&context), Ok(CsValue::Boolean(true)));
        assert_eq!(*calls.borrow(), vec![2.0]);
    }

    // =========================================================================
    // Statements
    // =========================================================================

    #[test]
    fn test_assignment_and_block() {
        let program = Statement::Block(vec![
            Statement::assign("x", Expression::number(2.0)),
            Statement::assign(
                "y",
                Expression::arithmetic(
                    ArithmeticOperator::Multiply,
                    Expression::ident("x"),
                    Expression::number(10.0),
                ),
            ),
        ]);

        let context = run(&program).unwrap();
        assert_eq!(context.get("y"), Ok(CsValue::Number(20.0)));
    }

    #[test]
    fn test_if_else() {
        let program = |flag: bool| {
            Statement::if_else(
                Expression::boolean(flag),
                Statement::assign("branch", Expression::number(1.0)),
                Some(Statement::assign("branch", Expression::number(2.0))),
            )
        };

        assert_eq!(run(&program(true)).unwrap().get("branch"), Ok(CsValue::Number(1.0)));
        assert_eq!(run(&program(false)).unwrap().get("branch"), Ok(CsValue::Number(2.0)));

        let no_else = Statement::if_else(
            Expression::boolean(false),
            Statement::assign("branch", Expression::number(1.0)),
            None,
        );
        assert!(!run(&no_else).unwrap().contains("branch"));
    }

    #[test]
    fn test_if_requires_boolean_condition() {
        let program = Statement::if_else(
            Expression::number(1.0),
            Statement::Block(Vec::new()),
            None,
        );
        assert_eq!(
            run(&program).unwrap_err(),
            ScriptError::type_mismatch("boolean", "number")
        );
    }

    fn labelled(label: f64) -> Statement {
        Statement::assign("picked", Expression::number(label))
    }

    fn keyed_switch(subject: f64, with_default: bool) -> Statement {
        let mut cases = vec![
            CaseClause::Match {
                conditions: vec![Expression::number(1.0)],
                body: labelled(1.0),
            },
            CaseClause::Match {
                conditions: vec![Expression::number(2.0), Expression::number(3.0)],
                body: labelled(2.0),
            },
        ];
        if with_default {
            cases.push(CaseClause::Default {
                body: labelled(3.0),
            });
        }
        Statement::switch_on(Expression::number(subject), cases)
    }

    #[test]
    fn test_keyed_switch_picks_matching_case() {
        let context = run(&keyed_switch(2.0, true)).unwrap();
        assert_eq!(context.get("picked"), Ok(CsValue::Number(2.0)));

        let context = run(&keyed_switch(3.0, true)).unwrap();
        assert_eq!(context.get("picked"), Ok(CsValue::Number(2.0)));
    }

    #[test]
    fn test_keyed_switch_falls_to_default() {
        let context = run(&keyed_switch(9.0, true)).unwrap();
        assert_eq!(context.get("picked"), Ok(CsValue::Number(3.0)));
    }

    #[test]
    fn test_keyed_switch_without_match_fails() {
        assert_eq!(
            run(&keyed_switch(9.0, false)).unwrap_err(),
            ScriptError::NoMatchingCase {
                subject: "9".to_string()
            }
        );
    }

    #[test]
    fn test_default_is_tested_in_declaration_order() {
        let program = Statement::switch_on(
            Expression::number(2.0),
            vec![
                CaseClause::Default {
                    body: labelled(0.0),
                },
                CaseClause::Match {
                    conditions: vec![Expression::number(2.0)],
                    body: labelled(2.0),
                },
            ],
        );

        let context = run(&program).unwrap();
        assert_eq!(context.get("picked"), Ok(CsValue::Number(0.0)));
    }

    #[test]
    fn test_keyless_default_is_tested_in_declaration_order() {
        let (mut context, calls) = recording_context();
        let program = Statement::switch(vec![
            CaseClause::Match {
                conditions: vec![Expression::boolean(false)],
                body: labelled(1.0),
            },
            CaseClause::Default {
                body: labelled(0.0),
            },
            CaseClause::Match {
                conditions: vec![mark(2.0)],
                body: labelled(2.0),
            },
        ]);

        program.execute(&mut context).unwrap();
        assert_eq!(context.get("picked"), Ok(CsValue::Number(0.0)));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_keyed_switch_evaluates_subject_once() {
        let (mut context, calls) = recording_context();
        let program = Statement::switch_on(
            mark(1.0),
            vec![
                CaseClause::Match {
                    conditions: vec![Expression::boolean(false)],
                    body: labelled(1.0),
                },
                CaseClause::Match {
                    conditions: vec![Expression::boolean(true)],
                    body: labelled(2.0),
                },
            ],
        );

        program.execute(&mut context).unwrap();
        assert_eq!(context.get("picked"), Ok(CsValue::Number(2.0)));
        assert_eq!(*calls.borrow(), vec![1.0]);
    }

    #[test]
    fn test_keyless_switch() {
        let (mut context, calls) = recording_context();
        context.set("hp", CsValue::Number(30.0));

        let program = Statement::switch(vec![
            CaseClause::Match {
                conditions: vec![Expression::less(
                    Expression::ident("hp"),
                    Expression::number(10.0),
                )],
                body: labelled(1.0),
            },
            CaseClause::Match {
                conditions: vec![
                    Expression::less(Expression::ident("hp"), Expression::number(50.0)),
                    mark(1.0),
                ],
                body: labelled(2.0),
            },
            CaseClause::Default {
                body: labelled(3.0),
            },
        ]);

        program.execute(&mut context).unwrap();
        assert_eq!(context.get("picked"), Ok(CsValue::Number(2.0)));
        // Conditions stop at the first true value.
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_large_subject_reported_exactly() {
        let program = Statement::switch_on(
            Expression::number(1e20),
            vec![CaseClause::Match {
                conditions: vec![Expression::number(1.0)],
                body: labelled(1.0),
            }],
        );
        let error = run(&program).unwrap_err();
        assert_eq!(
            error,
            ScriptError::NoMatchingCase {
                subject: "100000000000000000000".to_string()
            }
        );
    }

    #[test]
    fn test_keyless_switch_without_match_fails() {
        let program = Statement::switch(vec![CaseClause::Match {
            conditions: vec![Expression::boolean(false)],
            body: labelled(1.0),
        }]);
        assert_eq!(
            run(&program).unwrap_err(),
            ScriptError::NoMatchingCase {
                subject: "none".to_string()
            }
        );
    }

    #[test]
    fn test_script_initialize_then_execute() {
        let script = CsScript::new(Statement::assign(
            "threshold",
            Expression::arithmetic(
                ArithmeticOperator::Add,
                Expression::ident("threshold"),
                Expression::number(1.0),
            ),
        ))
        .with_initialize(Statement::assign("threshold", Expression::number(0.5)));

        let mut context = CsContext::new();
        script.initialize(&mut context).unwrap();
        script.execute(&mut context).unwrap();
        assert_eq!(context.get("threshold"), Ok(CsValue::Number(1.5)));
    }

    proptest! {
        #[test]
        fn prop_arithmetic_matches_f64(a in -1.0e6f64..1.0e6, b in 1.0f64..1.0e3) {
            let context = CsContext::new();
            for op in [
                ArithmeticOperator::Add,
                ArithmeticOperator::Subtract,
                ArithmeticOperator::Multiply,
                ArithmeticOperator::Divide,
                ArithmeticOperator::Modulo,
            ] {
                let expr = Expression::arithmetic(op, Expression::number(a), Expression::number(b));
                prop_assert_eq!(expr.evaluate(&context), Ok(CsValue::Number(op.apply(a, b))));
            }
        }

        #[test]
        fn prop_comparison_matches_f64(a in -1.0e3f64..1.0e3, b in -1.0e3f64..1.0e3) {
            let context = CsContext::new();
            let less = Expression::less(Expression::number(a), Expression::number(b));
            prop_assert_eq!(less.evaluate(&context), Ok(CsValue::Boolean(a < b)));
        }
    }
}
