//! Event dispatch tables.
//!
//! Each domain with at least one event gets a [`DispatcherPrototype`]
//! holding the declared field order of its events. A connection wraps it in
//! a [`Dispatcher`] that routes notifications to the client's
//! [`DomainDispatcher`] as positional arguments.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `handler` | Handler trait and closure-table implementation |

// ============================================================================
// Submodules
// ============================================================================

/// Domain event handlers.
pub mod handler;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{info, trace};

use crate::error::Error;
use crate::protocol::Event;
use crate::runtime::Options;

// ============================================================================
// Re-exports
// ============================================================================

pub use handler::{DomainDispatcher, EventCallback, FnDispatcher};

// ============================================================================
// DispatcherPrototype
// ============================================================================

/// Event table of one domain.
#[derive(Debug, Clone)]
pub struct DispatcherPrototype {
    /// Domain name.
    domain: String,
    /// Field order by qualified event name.
    events: FxHashMap<String, Vec<String>>,
}

impl DispatcherPrototype {
    /// Creates an empty event table.
    pub(crate) fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            events: FxHashMap::default(),
        }
    }

    /// Stores the field order of an event under its qualified name.
    pub(crate) fn register_event(&mut self, qualified: String, fields: Vec<String>) {
        self.events.insert(qualified, fields);
    }

    /// Returns the domain name.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the field order of an event by qualified name.
    #[inline]
    #[must_use]
    pub fn fields(&self, qualified: &str) -> Option<&[String]> {
        self.events.get(qualified).map(Vec::as_slice)
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Per-connection event router of one domain.
pub(crate) struct Dispatcher {
    prototype: Arc<DispatcherPrototype>,
    handler: RwLock<Option<Arc<dyn DomainDispatcher>>>,
}

impl Dispatcher {
    pub(crate) fn new(prototype: Arc<DispatcherPrototype>) -> Self {
        Self {
            prototype,
            handler: RwLock::new(None),
        }
    }

    /// Binds the domain handler. Last write wins.
    pub(crate) fn set_domain_dispatcher(&self, handler: Arc<dyn DomainDispatcher>) {
        *self.handler.write() = Some(handler);
    }

    /// Routes one event to the bound handler.
    pub(crate) fn dispatch(&self, event_name: &str, event: &Event, options: &Options) {
        let Some(handler) = self.handler.read().clone() else {
            trace!(method = %event.method, "No handler bound, event dropped");
            return;
        };

        if !handler.implements(event_name) {
            options.reporter.protocol_error(
                &Error::protocol(format!(
                    "Attempted to dispatch an unimplemented method '{}'",
                    event.method
                )),
                &event.to_value(),
            );
            return;
        }

        let Some(fields) = self.prototype.fields(&event.method) else {
            options.reporter.protocol_error(
                &Error::protocol(format!(
                    "Attempted to dispatch an unspecified method '{}'",
                    event.method
                )),
                &event.to_value(),
            );
            return;
        };

        let args: Vec<Value> = match &event.params {
            Some(params) => fields
                .iter()
                .map(|field| params.get(field).cloned().unwrap_or(Value::Null))
                .collect(),
            None => Vec::new(),
        };

        let started = options.time_stats.then(Instant::now);
        handler.handle(event_name, &args);

        if let Some(started) = started {
            info!(
                method = %event.method,
                elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
                "time-stats"
            );
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
