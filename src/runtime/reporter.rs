//! Error reporting sink.
//!
//! Unroutable inbound messages and remote request failures are not returned
//! to any caller. They are handed to an [`ErrorReporter`] instead, and the
//! connection carries on.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::error;

use crate::error::Error;
use crate::protocol::ErrorObject;

// ============================================================================
// ErrorReporter
// ============================================================================

/// Receives non-fatal connection diagnostics.
pub trait ErrorReporter: Send + Sync {
    /// Called when an inbound message cannot be routed.
    ///
    /// `message` is the offending message, or the raw text when it was not
    /// valid JSON.
    fn protocol_error(&self, error: &Error, message: &Value);

    /// Called when a request fails with an unreserved remote error.
    ///
    /// `id` is set only when protocol dumps are enabled.
    fn request_failed(&self, method: &str, id: Option<u64>, error: &ErrorObject);
}

// ============================================================================
// TracingReporter
// ============================================================================

/// Reports through `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn protocol_error(&self, error: &Error, message: &Value) {
        error!(%error, %message, "Protocol Error");
    }

    fn request_failed(&self, method: &str, id: Option<u64>, error: &ErrorObject) {
        match id {
            Some(id) => error!(
                method,
                id,
                code = error.code,
                "Request with id = {id} failed. {}",
                error.message
            ),
            None => error!(method, code = error.code, "Request failed. {}", error.message),
        }
    }
}
