//! Protocol schema types.
//!
//! Commands and events are declared per domain with ordered, typed
//! parameters. These declarations are static data: they are registered once
//! with a [`Registry`](crate::Registry) and shared read-only by every
//! connection built from it.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `descriptor` | Loader for `{"domains": [...]}` protocol descriptions |

// ============================================================================
// Submodules
// ============================================================================

/// Protocol descriptor loader.
pub mod descriptor;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

// ============================================================================
// Re-exports
// ============================================================================

pub use descriptor::ProtocolDescriptor;

// ============================================================================
// ParamType
// ============================================================================

/// Primitive type of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// JSON string.
    String,
    /// Any JSON number.
    Number,
    /// JSON boolean.
    Boolean,
    /// JSON object, array or `null`.
    Object,
    /// Any present value.
    Any,
}

impl ParamType {
    /// Returns the name used in validation messages.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Any => "any",
        }
    }

    /// Returns `true` if `value` has this type.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object() || value.is_array() || value.is_null(),
            Self::Any => true,
        }
    }

    /// Returns the type name of a JSON value in the same vocabulary.
    #[must_use]
    pub fn name_of(value: &Value) -> &'static str {
        match value {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamType {
    type Err = Error;

    /// Parses a protocol type name.
    ///
    /// `integer` folds into `number` and `array` into `object`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "integer" | "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "object" | "array" => Ok(Self::Object),
            "any" => Ok(Self::Any),
            other => Err(Error::schema(format!("unsupported parameter type '{other}'"))),
        }
    }
}

// ============================================================================
// ParamSpec
// ============================================================================

/// One declared command parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name in the `params` object.
    pub name: String,

    /// Declared primitive type.
    #[serde(rename = "type")]
    pub param_type: ParamType,

    /// Whether the parameter may be left out.
    #[serde(default)]
    pub optional: bool,
}

impl ParamSpec {
    /// Creates a required parameter.
    #[inline]
    #[must_use]
    pub fn required(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            optional: false,
        }
    }

    /// Creates an optional parameter.
    #[inline]
    #[must_use]
    pub fn optional(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            optional: true,
        }
    }
}

// ============================================================================
// CommandSpec
// ============================================================================

/// A registered command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Owning domain.
    pub domain: String,
    /// Command name without the domain prefix.
    pub name: String,
    /// Ordered parameter declarations.
    pub params: Vec<ParamSpec>,
    /// Ordered names of the result fields handed to the reply.
    pub reply_fields: Vec<String>,
    /// Whether failed responses carry structured error data.
    pub has_error_data: bool,
}

impl CommandSpec {
    /// Returns the qualified `Domain.command` name.
    #[inline]
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.domain, self.name)
    }
}

// ============================================================================
// EventSpec
// ============================================================================

/// A registered event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSpec {
    /// Owning domain.
    pub domain: String,
    /// Event name without the domain prefix.
    pub name: String,
    /// Ordered parameter names used to build positional handler arguments.
    pub fields: Vec<String>,
}

impl EventSpec {
    /// Returns the qualified `Domain.event` name.
    #[inline]
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.domain, self.name)
    }
}

// ============================================================================
// Tests
// ============================================================================
