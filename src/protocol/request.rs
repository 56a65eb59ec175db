//! Request and Response message types.
//!
//! Defines the envelope format for command requests and responses
//! between the local end (this crate) and the remote peer.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{CONNECTION_CLOSED_ERROR_CODE, STUB_ERROR_CODE};

// ============================================================================
// Request
// ============================================================================

/// A command request from local end to remote end.
///
/// # Format
///
/// ```json
/// {
///   "id": 1,
///   "method": "Domain.command",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Connection-scoped identifier for request/response correlation.
    pub id: u64,

    /// Qualified method name, `Domain.command`.
    pub method: String,

    /// Named parameters. Omitted when the call supplied none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

impl Request {
    /// Creates a new request.
    #[inline]
    #[must_use]
    pub fn new(id: u64, method: impl Into<String>, params: Option<Map<String, Value>>) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from remote end to local end.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": 1, "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": 1, "error": { "message": "...", "code": -32601, "data": ... } }
/// ```
///
/// Synthesized responses (connection closed) carry no `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// Result object (if success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error object (if error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    /// Creates the response delivered to requests cut off by a closed
    /// connection.
    #[must_use]
    pub fn connection_closed(method: &str) -> Self {
        Self {
            id: None,
            result: None,
            error: Some(ErrorObject {
                message: format!("Connection is closed, can't dispatch pending {method}"),
                code: CONNECTION_CLOSED_ERROR_CODE,
                data: None,
            }),
        }
    }

    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Reads the body of a response whose `id` is already known.
    ///
    /// Never fails. An `error` member that does not have the expected shape
    /// becomes an error with [`STUB_ERROR_CODE`], and the second element
    /// describes what was wrong with it.
    #[must_use]
    pub fn from_message(id: u64, message: &Value) -> (Self, Option<String>) {
        let result = message.get("result").filter(|v| !v.is_null()).cloned();

        let Some(raw) = message.get("error").filter(|v| !v.is_null()) else {
            return (
                Self {
                    id: Some(id),
                    result,
                    error: None,
                },
                None,
            );
        };

        let (error, defect) = match serde_json::from_value::<ErrorObject>(raw.clone()) {
            Ok(error) => (error, None),
            Err(e) => {
                let message = match raw.get("message").and_then(Value::as_str) {
                    Some(message) => message.to_string(),
                    None => match raw {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    },
                };
                let error = ErrorObject {
                    message,
                    code: STUB_ERROR_CODE,
                    data: raw.get("data").cloned(),
                };
                (error, Some(e.to_string()))
            }
        };

        (
            Self {
                id: Some(id),
                result,
                error: Some(error),
            },
            defect,
        )
    }
}

// ============================================================================
// ErrorObject
// ============================================================================

/// The `error` member of a failed response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Human-readable error message.
    #[serde(default)]
    pub message: String,

    /// Numeric error code.
    #[serde(default)]
    pub code: i64,

    /// Structured error data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    /// Returns `true` for the codes the runtime itself produces.
    ///
    /// These are never reported as request failures.
    #[inline]
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.code == CONNECTION_CLOSED_ERROR_CODE || self.code == STUB_ERROR_CODE
    }
}

// ============================================================================
// Tests
// ============================================================================
