//! Connection configuration.
//!
//! # Example
//!
//! ```ignore
//! use inspector_backend::Options;
//!
//! let options = Options::new()
//!     .with_protocol_dump()
//!     .with_time_stats();
//!
//! let connection = registry.connect_with_options(transport, options);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use super::reporter::{ErrorReporter, TracingReporter};

// ============================================================================
// Options
// ============================================================================

/// Per-connection diagnostics configuration.
#[derive(Clone)]
pub struct Options {
    /// Log every outgoing and incoming envelope at debug level.
    ///
    /// Also adds the request id to request failure reports.
    pub dump_protocol_messages: bool,

    /// Record send timestamps and log round-trip and event processing times.
    pub time_stats: bool,

    /// Do not report remote request failures at all.
    pub suppress_request_errors: bool,

    /// Sink for protocol errors and request failures.
    pub reporter: Arc<dyn ErrorReporter>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dump_protocol_messages: false,
            time_stats: false,
            suppress_request_errors: false,
            reporter: Arc::new(TracingReporter),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("dump_protocol_messages", &self.dump_protocol_messages)
            .field("time_stats", &self.time_stats)
            .field("suppress_request_errors", &self.suppress_request_errors)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Options {
    /// Creates options with every diagnostic off and the tracing reporter.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl Options {
    /// Enables protocol message dumps.
    #[inline]
    #[must_use]
    pub fn with_protocol_dump(mut self) -> Self {
        self.dump_protocol_messages = true;
        self
    }

    /// Enables timing diagnostics.
    #[inline]
    #[must_use]
    pub fn with_time_stats(mut self) -> Self {
        self.time_stats = true;
        self
    }

    /// Disables request failure reporting for every domain.
    #[inline]
    #[must_use]
    pub fn with_suppressed_request_errors(mut self) -> Self {
        self.suppress_request_errors = true;
        self
    }

    /// Replaces the error reporter.
    #[inline]
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let options = Options::new();
        assert!(!options.dump_protocol_messages);
        assert!(!options.time_stats);
        assert!(!options.suppress_request_errors);
    }

    #[test]
    fn test_builder_chain() {
        let options = Options::new()
            .with_protocol_dump()
            .with_time_stats()
            .with_suppressed_request_errors();

        assert!(options.dump_protocol_messages);
        assert!(options.time_stats);
        assert!(options.suppress_request_errors);
    }

    #[test]
    fn test_debug_omits_reporter() {
        let rendered = format!("{:?}", Options::new().with_time_stats());
        assert!(rendered.contains("time_stats: true"));
        assert!(!rendered.contains("reporter"));
    }
}
