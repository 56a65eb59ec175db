//! Error types for the inspector backend runtime.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use inspector_backend::{Arg, Result};
//!
//! async fn example(connection: &Connection) -> Result<()> {
//!     let agent = connection.agent("Page").expect("Page domain");
//!     agent.call("reload", vec![Arg::from(true)]).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Schema`] |
//! | Call site | [`Error::Validation`], [`Error::UnknownCommand`] |
//! | Protocol | [`Error::Protocol`] |
//! | Connection | [`Error::Connection`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::ChannelClosed`] |
//!
//! Remote errors (an `error` object in a response) are not represented here:
//! they travel through the reply arguments, see [`crate::agent::ReplyArgs`].

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when runtime or transport configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Protocol schema error.
    ///
    /// Returned when a protocol descriptor cannot be turned into commands
    /// and events.
    #[error("Schema error: {message}")]
    Schema {
        /// Description of the schema error.
        message: String,
    },

    // ========================================================================
    // Call Site Errors
    // ========================================================================
    /// Stub arguments do not match the command signature.
    ///
    /// Nothing is sent and no message id is consumed.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the argument mismatch.
        message: String,
    },

    /// Command is not registered for the domain.
    #[error("Unknown command: {command}")]
    UnknownCommand {
        /// Qualified command name (`Domain.command`).
        command: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Inbound message could not be routed.
    ///
    /// Reported through the error reporter; the connection keeps running.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connection could not be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Reply channel dropped before a response arrived.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a schema error.
    #[inline]
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    #[inline]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an unknown command error.
    #[inline]
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error was raised at the stub call site.
    #[inline]
    #[must_use]
    pub fn is_call_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::UnknownCommand { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ChannelClosed(_) | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
