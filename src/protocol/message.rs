//! Inbound message classification.
//!
//! The transport hands over either raw text or an already-parsed JSON value.
//! A message with an `id` member is a response; anything else is an event.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::{Error, Result};

use super::{Event, Response};

// ============================================================================
// RawMessage
// ============================================================================

/// An inbound message as delivered by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum RawMessage {
    /// Unparsed JSON text.
    Text(String),
    /// Already-parsed JSON value.
    Object(Value),
}

impl From<&str> for RawMessage {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for RawMessage {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for RawMessage {
    fn from(value: Value) -> Self {
        Self::Object(value)
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Response to a request sent on this connection.
    Response {
        /// Correlation id.
        id: u64,
        /// Response body.
        response: Response,
        /// What was wrong with the body, if it had to be read leniently.
        defect: Option<String>,
    },
    /// Event notification.
    Event(Event),
}

impl Inbound {
    /// Classifies a parsed message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the `id` is not a non-negative integer
    /// or if an event has no string `method`. A valid `id` always yields a
    /// response, whatever the shape of its body.
    pub fn classify(value: &Value) -> Result<Self> {
        if let Some(id) = value.get("id") {
            let id = id
                .as_u64()
                .ok_or_else(|| Error::protocol("the message with wrong id"))?;
            let (response, defect) = Response::from_message(id, value);
            return Ok(Self::Response {
                id,
                response,
                defect,
            });
        }

        serde_json::from_value::<Event>(value.clone())
            .map(Self::Event)
            .map_err(|e| Error::protocol(format!("malformed event: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_response() {
        let inbound = Inbound::classify(&json!({"id": 4, "result": {}})).expect("classify");
        match inbound {
            Inbound::Response { id, response, defect } => {
                assert_eq!(id, 4);
                assert_eq!(response.result, Some(json!({})));
                assert!(defect.is_none());
            }
            Inbound::Event(_) => panic!("expected response"),
        }
    }

    #[test]
    fn test_classify_event() {
        let inbound =
            Inbound::classify(&json!({"method": "Net.foo", "params": {"a": 1}})).expect("classify");
        assert!(matches!(inbound, Inbound::Event(ref e) if e.method == "Net.foo"));
    }

    #[test]
    fn test_classify_wrong_id() {
        let err = Inbound::classify(&json!({"id": "abc"})).unwrap_err();
        assert!(err.to_string().contains("wrong id"));
    }

    #[test]
    fn test_classify_malformed_error_body_is_still_a_response() {
        for message in [
            json!({"id": 1, "error": {"message": null, "code": 7}}),
            json!({"id": 1, "error": "boom"}),
            json!({"id": 1, "error": {"message": "x", "code": "seven"}}),
        ] {
            let inbound = Inbound::classify(&message).expect("classify");
            match inbound {
                Inbound::Response { id, response, defect } => {
                    assert_eq!(id, 1);
                    assert!(response.is_error());
                    assert!(defect.is_some());
                }
                Inbound::Event(_) => panic!("expected response"),
            }
        }
    }

    #[test]
    fn test_classify_event_without_method() {
        let err = Inbound::classify(&json!({"params": {}})).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }
}
