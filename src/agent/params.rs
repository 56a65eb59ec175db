//! Call-site arguments and parameter preparation.
//!
//! A validating stub call takes positional [`Arg`]s. They are matched
//! against the command's declared parameters in order and folded into the
//! named `params` object of the request.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::schema::{ParamSpec, ParamType};

use super::ReplyArgs;

// ============================================================================
// Types
// ============================================================================

/// Reply transform of a validating call.
///
/// Invoked with the reply arguments; its return value fulfills the call.
pub type ReplyTransform = Box<dyn FnOnce(&ReplyArgs) -> Value + Send>;

// ============================================================================
// Arg
// ============================================================================

/// One positional argument of a stub call.
pub enum Arg {
    /// A present JSON value.
    Value(Value),
    /// An absent value. Optional parameters given `Undefined` are skipped.
    Undefined,
    /// A reply transform. Only meaningful as the last argument.
    Callback(ReplyTransform),
}

impl Arg {
    /// Wraps a closure as a reply transform argument.
    #[inline]
    #[must_use]
    pub fn callback<F>(transform: F) -> Self
    where
        F: FnOnce(&ReplyArgs) -> Value + Send + 'static,
    {
        Self::Callback(Box::new(transform))
    }

    /// Returns the type name used in validation messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Value(value) => ParamType::name_of(value),
            Self::Undefined => "undefined",
            Self::Callback(_) => "function",
        }
    }

    /// Returns `true` for [`Arg::Callback`].
    #[inline]
    #[must_use]
    pub fn is_callback(&self) -> bool {
        matches!(self, Self::Callback(_))
    }

    /// Extracts the transform of a callback argument.
    #[inline]
    pub(crate) fn into_callback(self) -> Option<ReplyTransform> {
        match self {
            Self::Callback(transform) => Some(transform),
            _ => None,
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Undefined => f.write_str("Undefined"),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Undefined, Into::into)
    }
}

// ============================================================================
// Parameter Preparation
// ============================================================================

/// Folds positional arguments into a named parameter object.
///
/// `allow_extra_undefined` permits a single trailing [`Arg::Undefined`]; it
/// is set when the caller did not pass a reply transform.
///
/// Returns `None` when no parameter value was supplied.
///
/// # Errors
///
/// Returns [`Error::Validation`] on a missing required argument, a type
/// mismatch, or unconsumed trailing arguments.
pub(crate) fn prepare_parameters(
    method: &str,
    signature: &[ParamSpec],
    args: Vec<Arg>,
    allow_extra_undefined: bool,
) -> Result<Option<Map<String, Value>>> {
    let mut params = Map::new();
    let mut args = args.into_iter();

    for spec in signature {
        let arg = match args.next() {
            Some(arg) => arg,
            None if spec.optional => continue,
            None => {
                return Err(Error::validation(format!(
                    "Invalid number of arguments for method '{method}' call. \
                     It must have the following arguments '{}'.",
                    serde_json::to_string(signature).unwrap_or_default()
                )));
            }
        };

        match arg {
            Arg::Undefined if spec.optional => {}
            Arg::Value(value) if spec.param_type.matches(&value) => {
                params.insert(spec.name.clone(), value);
            }
            other => {
                return Err(Error::validation(format!(
                    "Invalid type of argument '{}' for method '{method}' call. \
                     It must be '{}' but it is '{}'.",
                    spec.name,
                    spec.param_type,
                    other.type_name()
                )));
            }
        }
    }

    let rest: Vec<Arg> = args.collect();
    match rest.as_slice() {
        [] => {}
        [Arg::Undefined] if allow_extra_undefined => {}
        [single] => {
            return Err(Error::validation(format!(
                "Optional callback argument for method '{method}' call \
                 must be a function but its type is '{}'.",
                single.type_name()
            )));
        }
        extra => {
            return Err(Error::validation(format!(
                "Extra {} arguments in a call to method '{method}'.",
                extra.len()
            )));
        }
    }

    Ok((!params.is_empty()).then_some(params))
}

// ============================================================================
// Tests
// ============================================================================
