//! Syntax tree for strategy scripts.
//!
//! The node set is closed: statements and expressions are enums and the
//! evaluator matches on them exhaustively. Trees are immutable once built
//! and are shared read-only across every stage that runs them.

use serde::{Deserialize, Serialize};

use super::value::CsValue;

/// A complete strategy script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsScript {
    /// Runs once per stage. Variables it binds seed every turn's context.
    #[serde(default)]
    pub initialize: Option<Statement>,
    /// Runs once per turn.
    pub body: Statement,
}

impl CsScript {
    /// Create a script without an initializer.
    #[must_use]
    pub fn new(body: Statement) -> Self {
        Self {
            initialize: None,
            body,
        }
    }

    /// Set the initializer.
    #[must_use]
    pub fn with_initialize(mut self, initialize: Statement) -> Self {
        self.initialize = Some(initialize);
        self
    }
}

/// A node that is executed for its effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Statements executed in order.
    Block(Vec<Statement>),

    /// Evaluate `value` and bind it to `name`.
    Assign {
        /// Variable name.
        name: String,
        /// Value to bind.
        value: Expression,
    },

    /// Two-way conditional.
    If {
        /// Must evaluate to a boolean.
        condition: Expression,
        /// Executed when the condition is true.
        then_branch: Box<Statement>,
        /// Executed when the condition is false.
        #[serde(default)]
        else_branch: Option<Box<Statement>>,
    },

    /// Multi-way branch. Keyed when `subject` is present, keyless otherwise.
    Switch {
        /// Value compared against each case's conditions.
        #[serde(default)]
        subject: Option<Expression>,
        /// Cases, tested in declaration order.
        cases: Vec<CaseClause>,
    },

    /// Evaluate and discard.
    Expression(Expression),
}

/// One arm of a [`Statement::Switch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaseClause {
    /// Matches when any condition matches.
    Match {
        /// Candidate values (keyed) or boolean tests (keyless).
        conditions: Vec<Expression>,
        /// Executed on match.
        body: Statement,
    },

    /// Matches unconditionally when reached.
    Default {
        /// Executed on match.
        body: Statement,
    },
}

impl CaseClause {
    /// Body executed when this case is selected.
    #[must_use]
    pub fn body(&self) -> &Statement {
        match self {
            Self::Match { body, .. } | Self::Default { body } => body,
        }
    }
}

/// A node that produces a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Variable reference.
    Identifier(String),

    /// Constant.
    Literal(Literal),

    /// `target.name`
    Attribute {
        /// Value whose attribute is read.
        target: Box<Expression>,
        /// Attribute name.
        name: String,
    },

    /// `callee(args...)`
    Call {
        /// Value being called.
        callee: Box<Expression>,
        /// Arguments, evaluated left to right.
        #[serde(default)]
        args: Vec<Expression>,
    },

    /// Prefix operator.
    Unary {
        /// Operator.
        op: UnaryOperator,
        /// Operand.
        operand: Box<Expression>,
    },

    /// Numeric infix operator.
    Arithmetic {
        /// Operator.
        op: ArithmeticOperator,
        /// Left operand.
        lhs: Box<Expression>,
        /// Right operand.
        rhs: Box<Expression>,
    },

    /// Short-circuiting boolean operator.
    Logical {
        /// Operator.
        op: LogicalOperator,
        /// Left operand.
        lhs: Box<Expression>,
        /// Right operand, evaluated only when needed.
        rhs: Box<Expression>,
    },

    /// Comparison operator.
    Comparison {
        /// Operator.
        op: ComparisonOperator,
        /// Left operand.
        lhs: Box<Expression>,
        /// Right operand.
        rhs: Box<Expression>,
    },
}

/// Constant values that can appear in a tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Number.
    Number(f64),
    /// Boolean.
    Boolean(bool),
}

impl Literal {
    /// Runtime value of this literal.
    #[must_use]
    pub fn to_value(self) -> CsValue {
        match self {
            Self::Number(n) => CsValue::Number(n),
            Self::Boolean(b) => CsValue::Boolean(b),
        }
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// `+x`
    Plus,
    /// `-x`
    Minus,
    /// `not x`
    Not,
}

/// Numeric infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithmeticOperator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
}

impl ArithmeticOperator {
    /// Apply to two numbers. Division follows IEEE-754.
    #[must_use]
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Subtract => lhs - rhs,
            Self::Multiply => lhs * rhs,
            Self::Divide => lhs / rhs,
            Self::Modulo => lhs % rhs,
        }
    }
}

/// Boolean infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOperator {
    /// `and`
    And,
    /// `or`
    Or,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
}

// ============================================================================
// Builders
// ============================================================================

impl Expression {
    /// Variable reference.
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }

    /// Number literal.
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Literal(Literal::Number(value))
    }

    /// Boolean literal.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::Literal(Literal::Boolean(value))
    }

    /// `self.name`
    #[must_use]
    pub fn attr(self, name: impl Into<String>) -> Self {
        Self::Attribute {
            target: Box::new(self),
            name: name.into(),
        }
    }

    /// `self(args...)`
    #[must_use]
    pub fn call(self, args: Vec<Expression>) -> Self {
        Self::Call {
            callee: Box::new(self),
            args,
        }
    }

    /// Prefix operator.
    #[must_use]
    pub fn unary(op: UnaryOperator, operand: Expression) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Numeric infix operator.
    #[must_use]
    pub fn arithmetic(op: ArithmeticOperator, lhs: Expression, rhs: Expression) -> Self {
        Self::Arithmetic {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Boolean infix operator.
    #[must_use]
    pub fn logical(op: LogicalOperator, lhs: Expression, rhs: Expression) -> Self {
        Self::Logical {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Comparison operator.
    #[must_use]
    pub fn compare(op: ComparisonOperator, lhs: Expression, rhs: Expression) -> Self {
        Self::Comparison {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// `lhs and rhs`
    #[must_use]
    pub fn and(lhs: Expression, rhs: Expression) -> Self {
        Self::logical(LogicalOperator::And, lhs, rhs)
    }

    /// `lhs or rhs`
    #[must_use]
    pub fn or(lhs: Expression, rhs: Expression) -> Self {
        Self::logical(LogicalOperator::Or, lhs, rhs)
    }

    /// `lhs = rhs`
    #[must_use]
    pub fn equal(lhs: Expression, rhs: Expression) -> Self {
        Self::compare(ComparisonOperator::Equal, lhs, rhs)
    }

    /// `lhs < rhs`
    #[must_use]
    pub fn less(lhs: Expression, rhs: Expression) -> Self {
        Self::compare(ComparisonOperator::Less, lhs, rhs)
    }
}

impl Statement {
    /// `name = value`
    pub fn assign(name: impl Into<String>, value: Expression) -> Self {
        Self::Assign {
            name: name.into(),
            value,
        }
    }

    /// `if condition then ... else ...`
    #[must_use]
    pub fn if_else(
        condition: Expression,
        then_branch: Statement,
        else_branch: Option<Statement>,
    ) -> Self {
        Self::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        }
    }

    /// Keyed switch over `subject`.
    #[must_use]
    pub fn switch_on(subject: Expression, cases: Vec<CaseClause>) -> Self {
        Self::Switch {
            subject: Some(subject),
            cases,
        }
    }

    /// Keyless switch.
    #[must_use]
    pub fn switch(cases: Vec<CaseClause>) -> Self {
        Self::Switch {
            subject: None,
            cases,
        }
    }

    /// Call `callee` with no arguments and discard the result.
    pub fn call(callee: impl Into<String>) -> Self {
        Self::Expression(Expression::ident(callee).call(Vec::new()))
    }
}
