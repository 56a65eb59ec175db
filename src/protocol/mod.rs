//! JSON protocol envelope types.
//!
//! This module defines the message format exchanged with the remote peer.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Local → Remote | Command request |
//! | `Response` | Remote → Local | Command response (matched by `id`) |
//! | `Event` | Remote → Local | Notification (no `id`) |
//!
//! # Method Naming
//!
//! Commands and events follow `Domain.name` format:
//!
//! - `Page.navigate`
//! - `Network.requestWillBeSent`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Event notification type |
//! | `message` | Raw inbound messages and classification |
//! | `request` | Request, Response and error object types |

// ============================================================================
// Submodules
// ============================================================================

/// Event notification type.
pub mod event;

/// Inbound message classification.
pub mod message;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::Event;
pub use message::{Inbound, RawMessage};
pub use request::{ErrorObject, Request, Response};

// ============================================================================
// Constants
// ============================================================================

/// Error code of responses synthesized for a closed connection.
pub const CONNECTION_CLOSED_ERROR_CODE: i64 = -32000;

/// Error code of internal stub errors.
pub const STUB_ERROR_CODE: i64 = -32015;
