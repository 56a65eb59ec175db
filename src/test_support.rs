//! Shared fixtures for unit tests.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::error::Error;
use crate::protocol::{ErrorObject, Request};
use crate::runtime::{ErrorReporter, Options, Registry};
use crate::schema::{ParamSpec, ParamType};
use crate::transport::{ChannelTransport, Connection};

// ============================================================================
// RecordingReporter
// ============================================================================

/// Reporter that keeps everything it is given.
#[derive(Default)]
pub struct RecordingReporter {
    protocol: Mutex<Vec<(String, Value)>>,
    failures: Mutex<Vec<(String, Option<u64>, i64)>>,
}

impl RecordingReporter {
    /// Rendered protocol errors, in report order.
    pub fn protocol_errors(&self) -> Vec<String> {
        self.protocol.lock().iter().map(|(e, _)| e.clone()).collect()
    }

    /// Offending messages of protocol errors, in report order.
    pub fn protocol_messages(&self) -> Vec<Value> {
        self.protocol.lock().iter().map(|(_, m)| m.clone()).collect()
    }

    /// `(method, id, code)` of request failures, in report order.
    pub fn failures(&self) -> Vec<(String, Option<u64>, i64)> {
        self.failures.lock().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn protocol_error(&self, error: &Error, message: &Value) {
        self.protocol.lock().push((error.to_string(), message.clone()));
    }

    fn request_failed(&self, method: &str, id: Option<u64>, error: &ErrorObject) {
        self.failures
            .lock()
            .push((method.to_string(), id, error.code));
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// `Net` domain with `fetch`, `replay` (error data) and `configure`
/// (all optional), event `Net.foo(a, b)`, plus an event-only `Page` domain.
pub fn net_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register_command(
        "Net",
        "fetch",
        vec![ParamSpec::required("url", ParamType::String)],
        vec!["body".into()],
        false,
    );
    registry.register_command(
        "Net",
        "replay",
        vec![ParamSpec::required("requestId", ParamType::String)],
        vec![],
        true,
    );
    registry.register_command(
        "Net",
        "configure",
        vec![
            ParamSpec::optional("depth", ParamType::Number),
            ParamSpec::optional("verbose", ParamType::Boolean),
        ],
        vec![],
        false,
    );
    registry.register_event("Net", "foo", vec!["a".into(), "b".into()]);
    registry.register_event("Page", "loaded", vec!["frameId".into()]);
    registry
}

/// Connects over a channel transport with a recording reporter.
pub fn connect(
    registry: &Registry,
) -> (Connection, mpsc::UnboundedReceiver<Request>, Arc<RecordingReporter>) {
    connect_with(registry, Options::new())
}

/// Like [`connect`], keeping the flags of `options`.
pub fn connect_with(
    registry: &Registry,
    options: Options,
) -> (Connection, mpsc::UnboundedReceiver<Request>, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::default());
    let (transport, outgoing) = ChannelTransport::new();
    let connection =
        registry.connect_with_options(transport, options.with_reporter(Arc::clone(&reporter) as _));
    (connection, outgoing, reporter)
}

/// Lets deferred tasks on the current runtime run to completion.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Installs a test subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
