//! Domain event handlers.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rustc_hash::FxHashMap;
use serde_json::Value;

// ============================================================================
// DomainDispatcher
// ============================================================================

/// Client-side handler for one domain's events.
///
/// Arguments arrive positionally, in the field order declared for the event.
pub trait DomainDispatcher: Send + Sync {
    /// Returns `true` if the handler accepts `event` (unqualified name).
    fn implements(&self, event: &str) -> bool;

    /// Handles one event.
    fn handle(&self, event: &str, args: &[Value]);
}

// ============================================================================
// FnDispatcher
// ============================================================================

/// Closure invoked with an event's positional arguments.
pub type EventCallback = Box<dyn Fn(&[Value]) + Send + Sync>;

/// A [`DomainDispatcher`] backed by a table of closures.
///
/// # Example
///
/// ```ignore
/// let handler = FnDispatcher::new()
///     .on("requestWillBeSent", |args| println!("{args:?}"));
/// connection.register_dispatcher("Network", Arc::new(handler));
/// ```
#[derive(Default)]
pub struct FnDispatcher {
    callbacks: FxHashMap<String, EventCallback>,
}

impl FnDispatcher {
    /// Creates an empty handler table.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a closure for `event`, replacing any previous one.
    #[must_use]
    pub fn on<F>(mut self, event: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.callbacks.insert(event.into(), Box::new(callback));
        self
    }
}

impl fmt::Debug for FnDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDispatcher")
            .field("events", &self.callbacks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DomainDispatcher for FnDispatcher {
    #[inline]
    fn implements(&self, event: &str) -> bool {
        self.callbacks.contains_key(event)
    }

    fn handle(&self, event: &str, args: &[Value]) {
        if let Some(callback) = self.callbacks.get(event) {
            callback(args);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
