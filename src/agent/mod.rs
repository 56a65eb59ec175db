//! Command stubs.
//!
//! Each domain with at least one command gets an [`AgentPrototype`], the
//! immutable command table built at schema load time. Every connection wraps
//! the shared prototype in its own agent state (error-logging suppression),
//! and hands out [`Agent`] handles for making calls.
//!
//! # Calling Conventions
//!
//! | Method | Validation | Result |
//! |--------|------------|--------|
//! | [`Agent::call`] | Arity and primitive types | Future of the transform's value |
//! | [`Agent::invoke`] | None | Raw [`ReplyArgs`] to a callback |
//!
//! # Example
//!
//! ```ignore
//! let agent = connection.agent("Net").expect("Net domain");
//! let body = agent
//!     .call("fetch", vec![
//!         Arg::from("http://example.com"),
//!         Arg::callback(|reply| reply.get(1).cloned().unwrap_or_default()),
//!     ])
//!     .await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Call-site arguments and parameter preparation.
pub mod params;

/// Reply argument layout and response callbacks.
pub mod reply;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::protocol::Response;
use crate::runtime::Options;
use crate::schema::{CommandSpec, ParamSpec};
use crate::transport::Connection;

use self::params::prepare_parameters;

// ============================================================================
// Re-exports
// ============================================================================

pub use params::{Arg, ReplyTransform};
pub use reply::{ReplyArgs, ResponseCallback, wrap_client_callback};

// ============================================================================
// AgentPrototype
// ============================================================================

/// Command table of one domain.
///
/// Shared read-only between connections.
#[derive(Debug, Clone)]
pub struct AgentPrototype {
    /// Domain name.
    domain: String,
    /// Commands by unqualified name.
    commands: FxHashMap<String, Arc<CommandSpec>>,
}

impl AgentPrototype {
    /// Creates an empty command table.
    pub(crate) fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            commands: FxHashMap::default(),
        }
    }

    /// Stores a command, replacing any earlier declaration of the same name.
    pub(crate) fn register_command(
        &mut self,
        name: &str,
        params: Vec<ParamSpec>,
        reply_fields: Vec<String>,
        has_error_data: bool,
    ) {
        let spec = CommandSpec {
            domain: self.domain.clone(),
            name: name.to_string(),
            params,
            reply_fields,
            has_error_data,
        };
        self.commands.insert(name.to_string(), Arc::new(spec));
    }

    /// Returns the domain name.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns a command by unqualified name.
    #[inline]
    #[must_use]
    pub fn command(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name).map(AsRef::as_ref)
    }

    /// Returns the number of registered commands.
    #[inline]
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}

// ============================================================================
// AgentState
// ============================================================================

/// Per-connection state of one domain's stubs.
pub(crate) struct AgentState {
    /// Shared command table.
    prototype: Arc<AgentPrototype>,
    /// Per-domain request failure suppression.
    suppress_error_logging: AtomicBool,
}

impl AgentState {
    pub(crate) fn new(prototype: Arc<AgentPrototype>) -> Self {
        Self {
            prototype,
            suppress_error_logging: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn prototype(&self) -> &AgentPrototype {
        &self.prototype
    }

    #[inline]
    pub(crate) fn suppress_error_logging(&self) {
        self.suppress_error_logging.store(true, Ordering::Relaxed);
    }

    /// Delivers a response to `callback` in the reply argument layout of
    /// `command`, reporting unreserved remote errors first.
    pub(crate) fn dispatch_response(
        &self,
        response: &Response,
        command: &str,
        callback: ResponseCallback,
        options: &Options,
    ) {
        let spec = self.prototype.command(command);

        if let Some(error) = &response.error
            && !error.is_reserved()
            && !options.suppress_request_errors
            && !self.suppress_error_logging.load(Ordering::Relaxed)
        {
            let method = format!("{}.{command}", self.prototype.domain);
            let id = if options.dump_protocol_messages {
                response.id
            } else {
                None
            };
            options.reporter.request_failed(&method, id, error);
        }

        callback(ReplyArgs::from_response(response, spec));
    }
}

// ============================================================================
// Agent
// ============================================================================

/// Handle to one domain's command stubs on a connection.
///
/// Cheap to clone; all clones share the connection.
#[derive(Clone)]
pub struct Agent {
    /// Owning connection.
    connection: Connection,
    /// Domain name.
    domain: String,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Creates a handle. The domain must have agent state on `connection`.
    pub(crate) fn new(connection: Connection, domain: impl Into<String>) -> Self {
        Self {
            connection,
            domain: domain.into(),
        }
    }

    /// Returns the domain name.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns `true` if the domain declares `command`.
    #[must_use]
    pub fn has_command(&self, command: &str) -> bool {
        self.state()
            .is_some_and(|state| state.prototype().command(command).is_some())
    }

    /// Calls a command with validated positional arguments.
    ///
    /// A trailing [`Arg::Callback`] is taken as the reply transform. The
    /// request is sent before this method returns; the future resolves with
    /// the transform's return value when the response arrives, or with
    /// `null` when no transform was given.
    ///
    /// Remote errors, including the synthesized connection-closed error, are
    /// delivered to the transform, not as `Err`.
    ///
    /// # Errors
    ///
    /// The returned future fails immediately, without sending anything or
    /// consuming a message id, with:
    ///
    /// - [`Error::UnknownCommand`] if the domain does not declare `command`
    /// - [`Error::Validation`] if the arguments do not match the signature
    /// - [`Error::ChannelClosed`] if the connection is dropped while the
    ///   request is pending
    pub fn call(
        &self,
        command: &str,
        args: Vec<Arg>,
    ) -> impl Future<Output = Result<Value>> + Send + use<> {
        let receiver = self.start_call(command, args);
        async move { Ok(receiver?.await?) }
    }

    /// Sends a command with an already-shaped parameter object.
    ///
    /// Skips validation entirely; `callback` receives the raw reply
    /// arguments.
    pub fn invoke(
        &self,
        command: &str,
        params: Option<Map<String, Value>>,
        callback: ResponseCallback,
    ) {
        if !self.has_command(command) {
            debug!(domain = %self.domain, command, "Invoking undeclared command");
        }
        self.connection.send(&self.domain, command, params, callback);
    }

    /// Stops reporting request failures for this domain on this connection.
    pub fn suppress_error_logging(&self) {
        if let Some(state) = self.state() {
            state.suppress_error_logging();
        }
    }

    /// Validates and sends; returns the receiver fulfilled by the response.
    fn start_call(&self, command: &str, mut args: Vec<Arg>) -> Result<oneshot::Receiver<Value>> {
        let method = format!("{}.{command}", self.domain);

        let spec = self
            .state()
            .and_then(|state| state.prototype().command(command))
            .ok_or_else(|| Error::unknown_command(method.clone()))?;

        let transform = if args.last().is_some_and(Arg::is_callback) {
            args.pop().and_then(Arg::into_callback)
        } else {
            None
        };

        let params = prepare_parameters(&method, &spec.params, args, transform.is_none())
            .inspect_err(|e| warn!(error = %e, "Rejected command call"))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let callback: ResponseCallback = Box::new(move |reply: ReplyArgs| {
            let value = transform.map_or(Value::Null, |transform| transform(&reply));
            let _ = reply_tx.send(value);
        });

        self.connection.send(&self.domain, command, params, callback);
        Ok(reply_rx)
    }

    #[inline]
    fn state(&self) -> Option<&AgentState> {
        self.connection.agent_state(&self.domain)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio_test::{assert_pending, assert_ready, assert_ready_err, task};

    use crate::protocol::CONNECTION_CLOSED_ERROR_CODE;
    use crate::schema::ParamType;
    use crate::test_support::{connect, net_registry};

    #[test]
    fn test_prototype_replaces_command() {
        let mut prototype = AgentPrototype::new("Net");
        prototype.register_command("fetch", vec![], vec!["a".into()], false);
        prototype.register_command(
            "fetch",
            vec![ParamSpec::required("url", ParamType::String)],
            vec!["body".into()],
            true,
        );

        assert_eq!(prototype.command_count(), 1);
        let spec = prototype.command("fetch").expect("registered");
        assert_eq!(spec.reply_fields, vec!["body".to_string()]);
        assert!(spec.has_error_data);
        assert_eq!(prototype.domain(), "Net");
    }

    #[test]
    fn test_missing_argument_fails_immediately() {
        let (connection, mut sent, _) = connect(&net_registry());
        let agent = connection.agent("Net").expect("agent");

        let mut call = task::spawn(agent.call("fetch", vec![]));
        let err = assert_ready_err!(call.poll());

        assert!(matches!(err, Error::Validation { .. }));
        assert!(sent.try_recv().is_err());
        assert_eq!(connection.pending_count(), 0);
    }

    #[test]
    fn test_unknown_command_fails_immediately() {
        let (connection, mut sent, _) = connect(&net_registry());
        let agent = connection.agent("Net").expect("agent");

        let mut call = task::spawn(agent.call("nope", vec![]));
        let err = assert_ready_err!(call.poll());

        assert!(matches!(err, Error::UnknownCommand { ref command } if command == "Net.nope"));
        assert!(sent.try_recv().is_err());
    }

    #[test]
    fn test_fetch_end_to_end_success() {
        let (connection, mut sent, _) = connect(&net_registry());
        let agent = connection.agent("Net").expect("agent");

        let mut call = task::spawn(agent.call(
            "fetch",
            vec![
                Arg::from("http://x"),
                Arg::callback(|reply| json!(reply.as_slice())),
            ],
        ));

        let request = sent.try_recv().expect("request sent");
        assert_eq!(
            serde_json::to_value(&request).expect("serialize"),
            json!({"id": 1, "method": "Net.fetch", "params": {"url": "http://x"}})
        );
        assert_pending!(call.poll());

        connection.dispatch(r#"{"id":1,"result":{"body":"hi"}}"#);

        assert!(call.is_woken());
        let value = assert_ready!(call.poll()).expect("resolved");
        assert_eq!(value, json!([null, "hi"]));
    }

    #[test]
    fn test_fetch_end_to_end_error_is_reported() {
        let (connection, mut sent, reporter) = connect(&net_registry());
        let agent = connection.agent("Net").expect("agent");

        let mut call = task::spawn(agent.call(
            "fetch",
            vec![
                Arg::from("http://x"),
                Arg::callback(|reply| json!(reply.as_slice())),
            ],
        ));
        sent.try_recv().expect("request sent");

        connection.dispatch(r#"{"id":1,"error":{"message":"boom","code":7}}"#);

        let value = assert_ready!(call.poll()).expect("resolved");
        assert_eq!(value, json!(["boom"]));
        assert_eq!(reporter.failures(), vec![("Net.fetch".to_string(), None, 7)]);
    }

    #[test]
    fn test_error_data_slot() {
        let (connection, _sent, _) = connect(&net_registry());
        let agent = connection.agent("Net").expect("agent");

        let mut call = task::spawn(agent.call(
            "replay",
            vec![
                Arg::from("r1"),
                Arg::callback(|reply| json!(reply.as_slice())),
            ],
        ));

        connection.dispatch(
            r#"{"id":1,"error":{"message":"gone","code":3,"data":{"reason":"evicted"}}}"#,
        );

        let value = assert_ready!(call.poll()).expect("resolved");
        assert_eq!(value, json!(["gone", {"reason": "evicted"}]));
    }

    #[test]
    fn test_without_transform_resolves_null() {
        let (connection, _sent, _) = connect(&net_registry());
        let agent = connection.agent("Net").expect("agent");

        let mut call = task::spawn(agent.call("fetch", vec![Arg::from("http://x")]));
        connection.dispatch(r#"{"id":1,"result":{"body":"hi"}}"#);

        assert_eq!(assert_ready!(call.poll()).expect("resolved"), Value::Null);
    }

    #[test]
    fn test_suppressed_domain_is_not_reported() {
        let (connection, _sent, reporter) = connect(&net_registry());
        let agent = connection.agent("Net").expect("agent");
        agent.suppress_error_logging();

        let mut call = task::spawn(agent.call("fetch", vec![Arg::from("http://x")]));
        connection.dispatch(r#"{"id":1,"error":{"message":"boom","code":7}}"#);

        assert_ready!(call.poll()).expect("resolved");
        assert!(reporter.failures().is_empty());
    }

    #[test]
    fn test_reserved_codes_are_not_reported() {
        let (connection, _sent, reporter) = connect(&net_registry());
        let agent = connection.agent("Net").expect("agent");

        let _call = agent.call("fetch", vec![Arg::from("http://x")]);
        connection.dispatch(json!({
            "id": 1,
            "error": {"message": "closed", "code": CONNECTION_CLOSED_ERROR_CODE}
        }));

        assert!(reporter.failures().is_empty());
    }

    #[test]
    fn test_invoke_bypasses_validation() {
        let (connection, mut sent, _) = connect(&net_registry());
        let agent = connection.agent("Net").expect("agent");

        let mut params = Map::new();
        params.insert("url".into(), json!(42));

        let seen = Arc::new(parking_lot::Mutex::new(None));
        let sink = Arc::clone(&seen);
        agent.invoke(
            "fetch",
            Some(params),
            Box::new(move |reply| *sink.lock() = Some(reply)),
        );

        let request = sent.try_recv().expect("request sent");
        let sent_params = request.params.expect("params present");
        assert_eq!(sent_params.get("url"), Some(&json!(42)));

        connection.dispatch(json!({"id": 1, "result": {"body": "ok"}}));
        assert_eq!(
            seen.lock().clone().expect("delivered").into_vec(),
            vec![Value::Null, json!("ok")]
        );
    }

    #[test]
    fn test_two_trailing_arguments_fail() {
        let (connection, mut sent, _) = connect(&net_registry());
        let agent = connection.agent("Net").expect("agent");

        let mut call = task::spawn(agent.call(
            "fetch",
            vec![
                Arg::from("http://x"),
                Arg::from("extra"),
                Arg::from("extra"),
                Arg::callback(|_| Value::Null),
            ],
        ));

        assert!(matches!(assert_ready_err!(call.poll()), Error::Validation { .. }));
        assert!(sent.try_recv().is_err());
    }

    #[test]
    fn test_has_command() {
        let (connection, _sent, _) = connect(&net_registry());
        let agent = connection.agent("Net").expect("agent");
        assert!(agent.has_command("fetch"));
        assert!(!agent.has_command("nope"));
        assert_eq!(agent.domain(), "Net");
    }
}
