//! Inspector Backend - Schema-driven runtime for JSON inspector protocols.
//!
//! This library turns a protocol schema (domains, each with typed commands
//! and events) into a working client over a bidirectional JSON message
//! channel.
//!
//! # Architecture
//!
//! The runtime follows a registry/connection model:
//!
//! - **Registry**: Static declarations of every domain's commands, events
//!   and enums, usually loaded from a protocol description
//! - **Connection**: Per-channel state built from the registry: request ids,
//!   pending responses, event handlers and error suppression
//!
//! Key design principles:
//!
//! - Requests are matched to responses purely by `id`
//! - Validation failures never reach the wire and never consume an id
//! - Remote errors arrive as reply arguments, not as `Err`
//! - Closing a connection resolves every pending request exactly once
//!
//! # Quick Start
//!
//! ```no_run
//! use inspector_backend::{Arg, Options, ProtocolDescriptor, Registry, Result, WebSocketTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let descriptor = ProtocolDescriptor::from_json(
//!         r#"{"domains": [{"domain": "Page", "commands": [{
//!             "name": "navigate",
//!             "parameters": [{"name": "url", "type": "string"}],
//!             "returns": [{"name": "frameId", "type": "string"}]
//!         }]}]}"#,
//!     )?;
//!
//!     let mut registry = Registry::new();
//!     registry.load_protocol(&descriptor)?;
//!
//!     let connection =
//!         WebSocketTransport::connect("ws://127.0.0.1:9222", &registry, Options::new()).await?;
//!
//!     let agent = connection.agent("Page").expect("Page domain");
//!     let frame = agent
//!         .call("navigate", vec![
//!             Arg::from("https://example.com"),
//!             Arg::callback(|reply| reply.get(1).cloned().unwrap_or_default()),
//!         ])
//!         .await?;
//!     println!("Navigated frame: {frame}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`agent`] | Command stubs: validation, reply layout |
//! | [`dispatcher`] | Event tables and domain handlers |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Message envelope types |
//! | [`runtime`] | [`Registry`], [`Options`], error reporting |
//! | [`schema`] | Parameter types and protocol description loader |
//! | [`transport`] | [`Connection`] core and transports |

// ============================================================================
// Modules
// ============================================================================

/// Command stubs.
///
/// - [`Agent`] - Per-connection handle for one domain's commands
/// - [`Arg`] - Positional call argument
/// - [`ReplyArgs`] - Positional reply arguments
pub mod agent;

/// Event dispatch tables.
///
/// Implement [`DomainDispatcher`] or use [`FnDispatcher`] to handle events.
pub mod dispatcher;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Protocol message types.
pub mod protocol;

/// Registry, configuration and error reporting.
pub mod runtime;

/// Protocol schema types and descriptor loader.
pub mod schema;

/// Connection core and transports.
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

// Stub types
pub use agent::{Agent, Arg, ReplyArgs, ResponseCallback, wrap_client_callback};

// Event types
pub use dispatcher::{DomainDispatcher, FnDispatcher};

// Error types
pub use error::{Error, Result};

// Runtime types
pub use runtime::{ErrorReporter, Options, Registry, TracingReporter};

// Schema types
pub use schema::{ParamSpec, ParamType, ProtocolDescriptor};

// Transport types
pub use transport::{ChannelTransport, Connection, Transport, WebSocketTransport};
