//! Strategy scripting interpreter.
//!
//! Strategies are small programs evaluated by the combat engine once per
//! turn to pick an action. The interpreter is a tree walker over a closed
//! set of node types:
//!
//! - [`value`] - Runtime values and the [`CsObject`] capability contract
//! - [`context`] - Variable scope for one script execution
//! - [`ast`] - Statement and expression nodes
//! - [`eval`] - Evaluation rules
//!
//! There is no grammar. Trees are built in code with the helpers on
//! [`Expression`] and [`Statement`], or deserialized from RON data.
//!
//! # Example
//!
//! ```
//! use sim_core::script::{CsContext, CsValue, Expression, Statement};
//!
//! let mut context = CsContext::new();
//! context.set("hp", CsValue::Number(40.0));
//!
//! let low = Expression::less(Expression::ident("hp"), Expression::number(50.0));
//! Statement::assign("low", low).execute(&mut context).unwrap();
//!
//! assert_eq!(context.get("low").unwrap(), CsValue::Boolean(true));
//! ```

pub mod ast;
pub mod context;
pub mod error;
pub mod eval;
pub mod value;

pub use ast::{
    ArithmeticOperator, CaseClause, ComparisonOperator, CsScript, Expression, Literal,
    LogicalOperator, Statement, UnaryOperator,
};
pub use context::CsContext;
pub use error::{ScriptError, ScriptResult};
pub use value::{CsObject, CsRecord, CsValue, NativeFunction};
