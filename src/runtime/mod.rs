//! Registry, configuration and error reporting.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `options` | Per-connection diagnostics configuration |
//! | `registry` | Domain declarations and connection construction |
//! | `reporter` | Sink for non-fatal protocol diagnostics |

// ============================================================================
// Submodules
// ============================================================================

/// Connection configuration.
pub mod options;

/// Domain registry.
pub mod registry;

/// Error reporting sink.
pub mod reporter;

// ============================================================================
// Re-exports
// ============================================================================

pub use options::Options;
pub use registry::Registry;
pub use reporter::{ErrorReporter, TracingReporter};
