//! Variable scope for one script execution.

use std::collections::HashMap;

use super::error::{ScriptError, ScriptResult};
use super::value::CsValue;

/// Mutable mapping from variable name to value.
///
/// A context is owned by whoever executes a script and is dropped when the
/// execution ends. Cloning is cheap: object values are shared pointers.
#[derive(Debug, Clone, Default)]
pub struct CsContext {
    variables: HashMap<String, CsValue>,
}

impl CsContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context pre-populated with bindings.
    pub fn with_bindings<I, K>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, CsValue)>,
        K: Into<String>,
    {
        Self {
            variables: bindings
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }

    /// Bind or rebind a variable.
    pub fn set(&mut self, name: impl Into<String>, value: CsValue) {
        self.variables.insert(name.into(), value);
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> ScriptResult<CsValue> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::UndefinedName(name.to_string()))
    }

    /// Whether a variable is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}
