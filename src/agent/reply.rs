//! Reply argument layout and response callbacks.
//!
//! Every response, successful or not, is flattened into one positional list:
//!
//! ```text
//! [error_message | null, (error_data | null)?, reply_value...]
//! ```
//!
//! The error data slot exists only for commands declared with structured
//! error data. Reply values follow the command's reply field order and are
//! present only when the response has a `result`.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::error;

use crate::protocol::Response;
use crate::schema::CommandSpec;

// ============================================================================
// Types
// ============================================================================

/// Callback receiving the reply arguments of one request.
pub type ResponseCallback = Box<dyn FnOnce(ReplyArgs) + Send>;

// ============================================================================
// ReplyArgs
// ============================================================================

/// Positional reply arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplyArgs(Vec<Value>);

impl ReplyArgs {
    /// Lays out a response for `spec`.
    ///
    /// Without a spec, only the error slot is produced. Error data sent for
    /// a command that does not declare it is dropped.
    #[must_use]
    pub fn from_response(response: &Response, spec: Option<&CommandSpec>) -> Self {
        let mut args = Vec::with_capacity(2 + spec.map_or(0, |s| s.reply_fields.len()));

        args.push(
            response
                .error
                .as_ref()
                .map_or(Value::Null, |e| Value::String(e.message.clone())),
        );

        let Some(spec) = spec else {
            return Self(args);
        };

        if spec.has_error_data {
            args.push(
                response
                    .error
                    .as_ref()
                    .and_then(|e| e.data.clone())
                    .unwrap_or(Value::Null),
            );
        }

        if let Some(result) = &response.result {
            args.extend(
                spec.reply_fields
                    .iter()
                    .map(|field| result.get(field).cloned().unwrap_or(Value::Null)),
            );
        }

        Self(args)
    }

    /// Returns the error message, if the request failed.
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.0.first().and_then(Value::as_str)
    }

    /// Returns `true` if the request failed.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }

    /// Returns the argument at `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Returns all arguments.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Returns the number of arguments.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no arguments.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the reply, returning the argument list.
    #[inline]
    #[must_use]
    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for ReplyArgs {
    fn from(args: Vec<Value>) -> Self {
        Self(args)
    }
}

// ============================================================================
// wrap_client_callback
// ============================================================================

/// Adapts a single-value client callback to a [`ResponseCallback`].
///
/// On failure the error is logged with `error_prefix` and `client` receives
/// `default`. Otherwise `client` receives `convert` applied to the first
/// value after the error slot.
///
/// # Example
///
/// ```ignore
/// let callback = wrap_client_callback("Failed to fetch: ", String::new(), |v| {
///     v.as_str().unwrap_or_default().to_string()
/// }, |body| println!("{body}"));
/// agent.invoke("fetch", Some(params), callback);
/// ```
pub fn wrap_client_callback<T, C, F>(
    error_prefix: impl Into<String>,
    default: T,
    convert: C,
    client: F,
) -> ResponseCallback
where
    T: Send + 'static,
    C: FnOnce(Value) -> T + Send + 'static,
    F: FnOnce(T) + Send + 'static,
{
    let error_prefix = error_prefix.into();

    Box::new(move |reply: ReplyArgs| {
        if let Some(message) = reply.error() {
            error!("{error_prefix}{message}");
            client(default);
            return;
        }

        let value = reply.get(1).cloned().unwrap_or(Value::Null);
        client(convert(value));
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::json;

    use crate::protocol::ErrorObject;

    fn spec(has_error_data: bool) -> CommandSpec {
        CommandSpec {
            domain: "Net".into(),
            name: "fetch".into(),
            params: vec![],
            reply_fields: vec!["body".into(), "status".into()],
            has_error_data,
        }
    }

    fn failure(data: Option<Value>) -> Response {
        Response {
            id: Some(1),
            result: None,
            error: Some(ErrorObject {
                message: "boom".into(),
                code: 7,
                data,
            }),
        }
    }

    #[test]
    fn test_success_layout_follows_reply_fields() {
        let response = Response {
            id: Some(1),
            result: Some(json!({"status": 200, "body": "hi"})),
            error: None,
        };

        let reply = ReplyArgs::from_response(&response, Some(&spec(false)));
        assert_eq!(reply.as_slice(), &[Value::Null, json!("hi"), json!(200)]);
        assert!(!reply.is_error());
    }

    #[test]
    fn test_missing_reply_field_is_null() {
        let response = Response {
            id: Some(1),
            result: Some(json!({"body": "hi"})),
            error: None,
        };

        let reply = ReplyArgs::from_response(&response, Some(&spec(false)));
        assert_eq!(reply.get(2), Some(&Value::Null));
    }

    #[test]
    fn test_error_without_error_data() {
        let reply = ReplyArgs::from_response(&failure(Some(json!(1))), Some(&spec(false)));
        assert_eq!(reply.into_vec(), vec![json!("boom")]);
    }

    #[test]
    fn test_error_with_error_data() {
        let reply =
            ReplyArgs::from_response(&failure(Some(json!({"line": 3}))), Some(&spec(true)));
        assert_eq!(reply.error(), Some("boom"));
        assert_eq!(reply.as_slice(), &[json!("boom"), json!({"line": 3})]);
    }

    #[test]
    fn test_error_data_slot_null_when_absent() {
        let reply = ReplyArgs::from_response(&failure(None), Some(&spec(true)));
        assert_eq!(reply.len(), 2);
        assert_eq!(reply.get(1), Some(&Value::Null));
    }

    #[test]
    fn test_without_spec() {
        let reply = ReplyArgs::from_response(&Response::connection_closed("X.y"), None);
        assert_eq!(reply.len(), 1);
        assert!(reply.is_error());
    }

    #[test]
    fn test_wrap_client_callback_success() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let callback = wrap_client_callback(
            "fetch failed: ",
            -1_i64,
            |v| v.as_i64().unwrap_or_default(),
            move |v| *sink.lock() = Some(v),
        );

        callback(ReplyArgs::from(vec![Value::Null, json!(42)]));
        assert_eq!(*seen.lock(), Some(42));
    }

    #[test]
    fn test_wrap_client_callback_error_uses_default() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let callback = wrap_client_callback(
            "fetch failed: ",
            -1_i64,
            |v| v.as_i64().unwrap_or_default(),
            move |v| *sink.lock() = Some(v),
        );

        callback(ReplyArgs::from(vec![json!("boom")]));
        assert_eq!(*seen.lock(), Some(-1));
    }
}
