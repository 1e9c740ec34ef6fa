//! Runtime values.
//!
//! [`CsValue`] is what every expression evaluates to. Numbers and booleans
//! are built in; everything else is an engine-supplied [`CsObject`] behind a
//! shared pointer. Values never represent "nothing": a missing variable or
//! attribute is an error, not a sentinel.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::error::{ScriptError, ScriptResult};

/// Capability contract for composite and engine-bound values.
///
/// Every method has a failing default, so an implementation only overrides
/// the capabilities it actually has.
pub trait CsObject: fmt::Debug {
    /// Name used in diagnostics.
    fn type_name(&self) -> &str;

    /// Numeric coercion.
    fn to_number(&self) -> ScriptResult<f64> {
        Err(ScriptError::type_mismatch("number", self.type_name()))
    }

    /// Boolean coercion.
    fn to_boolean(&self) -> ScriptResult<bool> {
        Err(ScriptError::type_mismatch("boolean", self.type_name()))
    }

    /// Attribute lookup.
    fn get_attribute(&self, name: &str) -> ScriptResult<CsValue> {
        Err(ScriptError::attribute(self.type_name(), name))
    }

    /// Call with already-evaluated arguments.
    fn invoke(&self, _args: &[CsValue]) -> ScriptResult<CsValue> {
        Err(ScriptError::NotCallable(self.type_name().to_string()))
    }
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum CsValue {
    /// Floating-point number.
    Number(f64),
    /// Boolean.
    Boolean(bool),
    /// Composite or native-bound value.
    Object(Rc<dyn CsObject>),
}

impl CsValue {
    /// Wrap an object implementation.
    pub fn object<T: CsObject + 'static>(object: T) -> Self {
        Self::Object(Rc::new(object))
    }

    /// Name of this value's type, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Object(object) => object.type_name(),
        }
    }

    /// Coerce to a number. Booleans do not coerce.
    pub fn to_number(&self) -> ScriptResult<f64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Boolean(_) => Err(ScriptError::type_mismatch("number", "boolean")),
            Self::Object(object) => object.to_number(),
        }
    }

    /// Coerce to a boolean. Numbers do not coerce.
    pub fn to_boolean(&self) -> ScriptResult<bool> {
        match self {
            Self::Boolean(b) => Ok(*b),
            Self::Number(_) => Err(ScriptError::type_mismatch("boolean", "number")),
            Self::Object(object) => object.to_boolean(),
        }
    }

    /// Look up an attribute.
    pub fn get_attribute(&self, name: &str) -> ScriptResult<CsValue> {
        match self {
            Self::Object(object) => object.get_attribute(name),
            other => Err(ScriptError::attribute(other.type_name(), name)),
        }
    }

    /// Call this value.
    pub fn invoke(&self, args: &[CsValue]) -> ScriptResult<CsValue> {
        match self {
            Self::Object(object) => object.invoke(args),
            other => Err(ScriptError::NotCallable(other.type_name().to_string())),
        }
    }
}

/// Equality by value identity: primitives by value, objects by pointer.
impl PartialEq for CsValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => {
                std::ptr::eq(Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>())
            }
            _ => false,
        }
    }
}

/// Largest magnitude below which every integral `f64` is exact.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

impl fmt::Display for CsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.abs() < EXACT_INTEGER_LIMIT => {
                write!(f, "{}", *n as i64)
            }
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Object(object) => write!(f, "<{}>", object.type_name()),
        }
    }
}

impl From<f64> for CsValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for CsValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<u32> for CsValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for CsValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Read-only bag of named attributes.
///
/// Engines use records to expose snapshots of their state, e.g. an actor
/// with `hp` and `max_hp`.
#[derive(Debug, Clone)]
pub struct CsRecord {
    type_name: String,
    attributes: BTreeMap<String, CsValue>,
}

impl CsRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute (builder style).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<CsValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

impl CsObject for CsRecord {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn get_attribute(&self, name: &str) -> ScriptResult<CsValue> {
        self.attributes
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::attribute(&self.type_name, name))
    }
}

type NativeBody = Box<dyn Fn(&[CsValue]) -> ScriptResult<CsValue>>;

/// Callable backed by a Rust closure.
pub struct NativeFunction {
    name: String,
    arity: Option<usize>,
    body: NativeBody,
}

impl NativeFunction {
    /// Create a function taking exactly `arity` arguments.
    pub fn new<F>(name: impl Into<String>, arity: usize, body: F) -> Self
    where
        F: Fn(&[CsValue]) -> ScriptResult<CsValue> + 'static,
    {
        Self {
            name: name.into(),
            arity: Some(arity),
            body: Box::new(body),
        }
    }

    /// Create a function accepting any number of arguments.
    pub fn variadic<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[CsValue]) -> ScriptResult<CsValue> + 'static,
    {
        Self {
            name: name.into(),
            arity: None,
            body: Box::new(body),
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl CsObject for NativeFunction {
    fn type_name(&self) -> &str {
        "function"
    }

    fn invoke(&self, args: &[CsValue]) -> ScriptResult<CsValue> {
        if let Some(expected) = self.arity {
            if args.len() != expected {
                return Err(ScriptError::Arity {
                    callee: self.name.clone(),
                    expected,
                    found: args.len(),
                });
            }
        }
        (self.body)(args)
    }
}
