//! Transport layer.
//!
//! The connection core is transport-agnostic: it hands finished request
//! envelopes to a [`Transport`] and expects inbound messages to be pushed
//! back through [`Connection::dispatch`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   send_message(&Request)   ┌──────────────────┐
//! │                  │ ─────────────────────────► │                  │
//! │    Connection    │                            │    Transport     │ ◄──► remote
//! │                  │ ◄───────────────────────── │                  │
//! └──────────────────┘    dispatch / close        └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | In-process transport over a tokio channel |
//! | `connection` | Request correlation, routing and close handling |
//! | `websocket` | WebSocket client transport with its event loop |

// ============================================================================
// Submodules
// ============================================================================

/// In-process channel transport.
pub mod channel;

/// Connection core.
pub mod connection;

/// WebSocket client transport.
pub mod websocket;

// ============================================================================
// Imports
// ============================================================================

use crate::protocol::Request;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::ChannelTransport;
pub use connection::{Connection, Continuation, DisconnectListener};
pub use websocket::WebSocketTransport;

// ============================================================================
// Transport
// ============================================================================

/// Outgoing half of a message channel.
pub trait Transport: Send + Sync {
    /// Queues one request envelope. Never blocks and never fails; delivery
    /// problems surface as a later [`Connection::close`].
    fn send_message(&self, request: &Request);

    /// Asks the channel to shut down.
    fn shutdown(&self) {}
}
