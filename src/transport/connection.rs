//! Connection core.
//!
//! A [`Connection`] owns the per-connection agent and dispatcher state of
//! every registered domain, the request id counter and the pending request
//! map. It never performs I/O itself: outgoing envelopes go to a
//! [`Transport`], and inbound messages are pushed in by whoever reads the
//! channel via [`Connection::dispatch`].
//!
//! # Lifecycle
//!
//! ```text
//! Open ──close(reason)──► Closed
//! ```
//!
//! Closing drains the pending map, delivering one synthesized
//! connection-closed error to each pending callback on a later turn. Sends
//! after close get the same error without touching the transport.
//!
//! # Turns
//!
//! Work that must not run inside the current call (closed-connection
//! deliveries, idle checks) goes to one ordered deferred queue. Inside a
//! tokio runtime a flush task is spawned for it. Without one, the queue is
//! flushed when the next [`dispatch`](Connection::dispatch) or
//! [`run_when_idle`](Connection::run_when_idle) begins, or by
//! [`run_deferred`](Connection::run_deferred).
//!
//! A dispatch and a flush each hold the turn lock for their whole run, so
//! they never overlap, even across worker threads.
//!
//! # Locking
//!
//! Id allocation, the pending map and the idle queue share one mutex.
//! Callbacks, handlers and the transport are always called with it released.
//! The turn lock is always taken before it.

// ============================================================================
// Imports
// ============================================================================

use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tracing::{debug, info, trace};

use crate::agent::{Agent, AgentPrototype, AgentState, ReplyArgs, ResponseCallback};
use crate::dispatcher::{Dispatcher, DispatcherPrototype, DomainDispatcher};
use crate::error::Error;
use crate::protocol::{Event, Inbound, RawMessage, Request, Response};
use crate::runtime::Options;

use super::Transport;

// ============================================================================
// Types
// ============================================================================

/// Work queued until no request is pending.
pub type Continuation = Box<dyn FnOnce() + Send>;

/// Called once with the close reason.
pub type DisconnectListener = Box<dyn Fn(&str) + Send + Sync>;

/// Work run on a later turn. Receives the connection instead of capturing
/// it, so queued work never keeps the connection alive.
type Deferred = Box<dyn FnOnce(&Connection) + Send>;

/// A sent request awaiting its response.
struct PendingRequest {
    domain: String,
    command: String,
    callback: ResponseCallback,
    sent_at: Option<Instant>,
}

/// Mutable state guarded by the connection mutex.
struct ConnectionState {
    next_id: u64,
    pending: FxHashMap<u64, PendingRequest>,
    connected: bool,
    idle_queue: Vec<Continuation>,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            next_id: 1,
            pending: FxHashMap::default(),
            connected: true,
            idle_queue: Vec::new(),
        }
    }

    #[inline]
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

struct ConnectionInner {
    transport: Arc<dyn Transport>,
    options: Options,
    agents: FxHashMap<String, AgentState>,
    dispatchers: FxHashMap<String, Dispatcher>,
    state: Mutex<ConnectionState>,
    listeners: Mutex<Vec<DisconnectListener>>,
    deferred: Mutex<VecDeque<Deferred>>,
    flush_scheduled: AtomicBool,
    /// Nesting depth of the current thread's turn.
    turn: ReentrantMutex<Cell<usize>>,
}

/// Held for the duration of a dispatch or a deferred flush.
struct Turn<'a> {
    depth: ReentrantMutexGuard<'a, Cell<usize>>,
}

impl Turn<'_> {
    /// `false` when entered from a callback of an enclosing turn.
    #[inline]
    fn is_outermost(&self) -> bool {
        self.depth.get() == 1
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

/// Non-owning handle for event loops that must not keep a connection open.
#[derive(Clone)]
pub(crate) struct WeakConnection {
    inner: Weak<ConnectionInner>,
}

impl WeakConnection {
    /// Returns the connection if any handle to it is still alive.
    pub(crate) fn upgrade(&self) -> Option<Connection> {
        self.inner.upgrade().map(|inner| Connection { inner })
    }
}

// ============================================================================
// Connection
// ============================================================================

/// One logical protocol connection.
///
/// Cheap to clone; all clones share the same state.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync`. Inbound messages must be dispatched one at
/// a time, in delivery order.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Connection")
            .field("connected", &state.connected)
            .field("next_id", &state.next_id)
            .field("pending", &state.pending.len())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Creates an open connection over `transport`.
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        agents: FxHashMap<String, Arc<AgentPrototype>>,
        dispatchers: FxHashMap<String, Arc<DispatcherPrototype>>,
        options: Options,
    ) -> Self {
        let agents = agents
            .into_iter()
            .map(|(domain, prototype)| (domain, AgentState::new(prototype)))
            .collect();
        let dispatchers = dispatchers
            .into_iter()
            .map(|(domain, prototype)| (domain, Dispatcher::new(prototype)))
            .collect();

        Self {
            inner: Arc::new(ConnectionInner {
                transport,
                options,
                agents,
                dispatchers,
                state: Mutex::new(ConnectionState::new()),
                listeners: Mutex::new(Vec::new()),
                deferred: Mutex::new(VecDeque::new()),
                flush_scheduled: AtomicBool::new(false),
                turn: ReentrantMutex::new(Cell::new(0)),
            }),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the command stubs of `domain`, if it declares any command.
    #[must_use]
    pub fn agent(&self, domain: &str) -> Option<Agent> {
        self.inner
            .agents
            .contains_key(domain)
            .then(|| Agent::new(self.clone(), domain))
    }

    #[inline]
    pub(crate) fn agent_state(&self, domain: &str) -> Option<&AgentState> {
        self.inner.agents.get(domain)
    }

    /// Returns the connection options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    /// Returns `true` once [`close`](Self::close) has run.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.inner.state.lock().connected
    }

    /// Returns the number of requests awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Allocates a message id. Ids start at 1 and never repeat.
    pub fn next_id(&self) -> u64 {
        self.inner.state.lock().allocate_id()
    }

    #[inline]
    pub(crate) fn downgrade(&self) -> WeakConnection {
        WeakConnection {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Binds the event handler of `domain`. Last write wins.
    ///
    /// Does nothing if the domain declares no events.
    pub fn register_dispatcher(&self, domain: &str, handler: Arc<dyn DomainDispatcher>) {
        match self.inner.dispatchers.get(domain) {
            Some(dispatcher) => dispatcher.set_domain_dispatcher(handler),
            None => debug!(domain, "No event table for domain, handler ignored"),
        }
    }

    /// Stops reporting request failures for each listed domain.
    pub fn suppress_errors_for_domains<I>(&self, domains: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for domain in domains {
            if let Some(state) = self.agent_state(domain.as_ref()) {
                state.suppress_error_logging();
            }
        }
    }

    /// Adds a listener notified with the reason when the connection closes.
    pub fn on_disconnect<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().push(Box::new(listener));
    }

    // ========================================================================
    // Outgoing
    // ========================================================================

    /// Sends `Domain.command` and registers `callback` for the response.
    ///
    /// On a closed connection the callback receives a connection-closed
    /// error on a later turn and nothing is sent.
    pub fn send(
        &self,
        domain: &str,
        command: &str,
        params: Option<Map<String, Value>>,
        callback: ResponseCallback,
    ) {
        let method = format!("{domain}.{command}");

        let request = {
            let mut state = self.inner.state.lock();

            if !state.connected {
                drop(state);
                debug!(%method, "Send on closed connection");

                let (domain, command) = (domain.to_string(), command.to_string());
                self.defer(Box::new(move |connection: &Connection| {
                    let response = Response::connection_closed(&method);
                    connection.deliver_response(&domain, &command, &response, callback);
                }));
                return;
            }

            let id = state.allocate_id();
            state.pending.insert(
                id,
                PendingRequest {
                    domain: domain.to_string(),
                    command: command.to_string(),
                    callback,
                    sent_at: self.inner.options.time_stats.then(Instant::now),
                },
            );
            Request::new(id, method, params)
        };

        if self.inner.options.dump_protocol_messages
            && let Ok(text) = serde_json::to_string(&request)
        {
            debug!("frontend: {text}");
        }

        trace!(id = request.id, method = %request.method, "Request sent");
        self.inner.transport.send_message(&request);
    }

    /// Asks the transport to shut the channel down.
    ///
    /// Transports with an event loop call [`close`](Self::close) once the
    /// channel is gone. Transports without one leave closing to the caller.
    pub fn disconnect(&self) {
        debug!("Disconnect requested");
        self.inner.transport.shutdown();
    }

    // ========================================================================
    // Incoming
    // ========================================================================

    /// Routes one inbound message.
    ///
    /// Unroutable messages are handed to the error reporter and otherwise
    /// ignored; the connection stays usable.
    ///
    /// Deferred work queued by earlier turns runs first. Work queued while
    /// this message is processed waits for a later turn.
    pub fn dispatch(&self, message: impl Into<RawMessage>) {
        let turn = self.enter_turn();
        if turn.is_outermost() {
            self.flush_deferred();
        }

        let value = match message.into() {
            RawMessage::Object(value) => value,
            RawMessage::Text(text) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => value,
                Err(e) => {
                    self.report(
                        &Error::protocol(format!("malformed message: {e}")),
                        &Value::String(text),
                    );
                    return;
                }
            },
        };

        if self.inner.options.dump_protocol_messages {
            debug!("backend: {value}");
        }

        match Inbound::classify(&value) {
            Ok(Inbound::Response {
                id,
                response,
                defect,
            }) => self.dispatch_response(id, &response, defect.as_deref(), &value),
            Ok(Inbound::Event(event)) => self.dispatch_event(&event, &value),
            Err(e) => self.report(&e, &value),
        }
    }

    fn dispatch_response(&self, id: u64, response: &Response, defect: Option<&str>, message: &Value) {
        let entry = self.inner.state.lock().pending.remove(&id);
        let Some(entry) = entry else {
            self.report(&Error::protocol("the message with wrong id"), message);
            return;
        };

        if let Some(defect) = defect {
            self.report(&Error::protocol(format!("malformed response: {defect}")), message);
        }

        let started = self.inner.options.time_stats.then(Instant::now);
        self.deliver_response(&entry.domain, &entry.command, response, entry.callback);

        if let (Some(sent_at), Some(started)) = (entry.sent_at, started) {
            let method = format!("{}.{}", entry.domain, entry.command);
            info!(
                %method,
                id,
                round_trip_ms = started.duration_since(sent_at).as_secs_f64() * 1000.0,
                processing_ms = started.elapsed().as_secs_f64() * 1000.0,
                "time-stats"
            );
        }

        let idle = {
            let state = self.inner.state.lock();
            state.pending.is_empty() && !state.idle_queue.is_empty()
        };
        if idle {
            self.schedule_idle_check();
        }
    }

    fn dispatch_event(&self, event: &Event, message: &Value) {
        let domain = event.domain();

        let Some(dispatcher) = self.inner.dispatchers.get(domain) else {
            self.report(
                &Error::protocol(format!(
                    "the message {} is for non-existing domain '{domain}'",
                    event.method
                )),
                message,
            );
            return;
        };

        dispatcher.dispatch(event.event_name(), event, &self.inner.options);
    }

    fn deliver_response(
        &self,
        domain: &str,
        command: &str,
        response: &Response,
        callback: ResponseCallback,
    ) {
        match self.agent_state(domain) {
            Some(state) => state.dispatch_response(response, command, callback, &self.inner.options),
            None => callback(ReplyArgs::from_response(response, None)),
        }
    }

    #[inline]
    fn report(&self, error: &Error, message: &Value) {
        self.inner.options.reporter.protocol_error(error, message);
    }

    // ========================================================================
    // Idle Continuations
    // ========================================================================

    /// Queues `continuation` to run once no request is pending.
    ///
    /// The check happens on a later turn. If requests are pending then, the
    /// queue waits until the pending map next becomes empty.
    pub fn run_when_idle(&self, continuation: Option<Continuation>) {
        self.run_deferred();

        if let Some(continuation) = continuation {
            self.inner.state.lock().idle_queue.push(continuation);
        }
        self.schedule_idle_check();
    }

    fn schedule_idle_check(&self) {
        self.defer(Box::new(Connection::run_idle_continuations));
    }

    fn run_idle_continuations(&self) {
        let queue = {
            let mut state = self.inner.state.lock();
            if !state.pending.is_empty() {
                return;
            }
            std::mem::take(&mut state.idle_queue)
        };

        if !queue.is_empty() {
            trace!(count = queue.len(), "Running idle continuations");
        }
        for continuation in queue {
            continuation();
        }
    }

    // ========================================================================
    // Close
    // ========================================================================

    /// Closes the connection. Only the first call has any effect.
    ///
    /// Every pending callback receives one connection-closed error on a
    /// later turn. Disconnect listeners are notified with `reason` right
    /// away.
    pub fn close(&self, reason: &str) {
        let mut drained = {
            let mut state = self.inner.state.lock();
            if !state.connected {
                return;
            }
            state.connected = false;
            state.pending.drain().collect::<Vec<_>>()
        };
        drained.sort_unstable_by_key(|(id, _)| *id);

        debug!(reason, pending = drained.len(), "Connection closed");

        self.defer(Box::new(move |connection: &Connection| {
            for (_, entry) in drained {
                let method = format!("{}.{}", entry.domain, entry.command);
                let response = Response::connection_closed(&method);
                connection.deliver_response(&entry.domain, &entry.command, &response, entry.callback);
            }
            connection.run_idle_continuations();
        }));

        let listeners = std::mem::take(&mut *self.inner.listeners.lock());
        for listener in &listeners {
            listener(reason);
        }
    }

    // ========================================================================
    // Deferred Work
    // ========================================================================

    /// Runs the deferred work queued by earlier turns, in queue order.
    ///
    /// Only needed without a tokio runtime, where nothing else schedules a
    /// flush before the next [`dispatch`](Self::dispatch). Does nothing when
    /// called from a callback of a running dispatch or flush.
    pub fn run_deferred(&self) {
        let turn = self.enter_turn();
        if turn.is_outermost() {
            self.flush_deferred();
        }
    }

    /// Queues `task` for a later turn.
    fn defer(&self, task: Deferred) {
        self.inner.deferred.lock().push_back(task);

        let Ok(handle) = Handle::try_current() else {
            trace!("No runtime, deferred task waits for the next turn");
            return;
        };
        if self.inner.flush_scheduled.swap(true, Ordering::AcqRel) {
            return;
        }

        let connection = self.downgrade();
        handle.spawn(async move {
            tokio::task::yield_now().await;
            if let Some(connection) = connection.upgrade() {
                connection.run_deferred();
            }
        });
    }

    /// Runs the tasks queued so far. Tasks they queue wait for the next turn.
    fn flush_deferred(&self) {
        self.inner.flush_scheduled.store(false, Ordering::Release);

        let batch = std::mem::take(&mut *self.inner.deferred.lock());
        if !batch.is_empty() {
            trace!(count = batch.len(), "Running deferred tasks");
        }
        for task in batch {
            task(self);
        }
    }

    fn enter_turn(&self) -> Turn<'_> {
        let depth = self.inner.turn.lock();
        depth.set(depth.get() + 1);
        Turn { depth }
    }
}

// ============================================================================
// Tests
// ============================================================================
