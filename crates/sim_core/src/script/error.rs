//! Interpreter error types.

use thiserror::Error;

/// Result type alias using [`ScriptError`].
pub type ScriptResult<T> = std::result::Result<T, ScriptError>;

/// Failure while evaluating a strategy script.
///
/// Every variant is terminal to the current evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// Identifier lookup failed.
    #[error("identifier '{0}' is not defined")]
    UndefinedName(String),

    /// Attribute lookup failed.
    #[error("{type_name} has no attribute '{name}'")]
    Attribute {
        /// Type of the value that was accessed.
        type_name: String,
        /// Requested attribute.
        name: String,
    },

    /// A value could not be coerced to the required type.
    #[error("expected {expected}, found {found}")]
    Type {
        /// Required type.
        expected: &'static str,
        /// Type actually supplied.
        found: String,
    },

    /// Call target is not callable.
    #[error("{0} is not callable")]
    NotCallable(String),

    /// Call supplied the wrong number of arguments.
    #[error("{callee} expects {expected} argument(s), got {found}")]
    Arity {
        /// Name of the callee.
        callee: String,
        /// Declared arity.
        expected: usize,
        /// Number of arguments supplied.
        found: usize,
    },

    /// A native function rejected its arguments.
    #[error("call to {callee} failed: {message}")]
    Call {
        /// Name of the callee.
        callee: String,
        /// Reason reported by the callee.
        message: String,
    },

    /// No switch case matched.
    #[error("no switch case matched (subject: {subject})")]
    NoMatchingCase {
        /// Rendered subject value, or `none` for keyless switches.
        subject: String,
    },
}

impl ScriptError {
    /// Create a type error for a value of type `found`.
    #[must_use]
    pub fn type_mismatch(expected: &'static str, found: impl Into<String>) -> Self {
        Self::Type {
            expected,
            found: found.into(),
        }
    }

    /// Create an attribute error.
    #[must_use]
    pub fn attribute(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Attribute {
            type_name: type_name.into(),
            name: name.into(),
        }
    }
}
