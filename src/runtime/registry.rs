//! Domain registry.
//!
//! The registry owns the command, event and enum declarations of every
//! domain. Connections are built from it and capture the prototypes that
//! exist at that moment.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::agent::AgentPrototype;
use crate::dispatcher::DispatcherPrototype;
use crate::error::Result;
use crate::schema::{CommandSpec, ParamSpec, ProtocolDescriptor};
use crate::transport::{Connection, Transport};

use super::Options;

// ============================================================================
// Registry
// ============================================================================

/// Declarations of every known domain.
///
/// Registration is copy-on-write: a connection keeps the prototypes it was
/// built with, so later registrations only affect later connections.
///
/// # Example
///
/// ```ignore
/// let mut registry = Registry::new();
/// registry.register_command("Net", "fetch", vec![ParamSpec::required("url", ParamType::String)], vec!["body".into()], false);
/// registry.register_event("Net", "foo", vec!["a".into(), "b".into()]);
///
/// let (transport, outgoing) = ChannelTransport::new();
/// let connection = registry.connect(transport);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    agents: FxHashMap<String, Arc<AgentPrototype>>,
    dispatchers: FxHashMap<String, Arc<DispatcherPrototype>>,
    enums: FxHashMap<String, Map<String, Value>>,
    initialized: bool,
}

// ============================================================================
// Registration
// ============================================================================

impl Registry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a command. Re-declaring a name replaces it.
    pub fn register_command(
        &mut self,
        domain: &str,
        command: &str,
        params: Vec<ParamSpec>,
        reply_fields: Vec<String>,
        has_error_data: bool,
    ) {
        let prototype = self
            .agents
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(AgentPrototype::new(domain)));

        Arc::make_mut(prototype).register_command(command, params, reply_fields, has_error_data);
        self.initialized = true;
    }

    /// Declares an event with its ordered field names.
    pub fn register_event(&mut self, domain: &str, event: &str, fields: Vec<String>) {
        let prototype = self
            .dispatchers
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(DispatcherPrototype::new(domain)));

        Arc::make_mut(prototype).register_event(format!("{domain}.{event}"), fields);
        self.initialized = true;
    }

    /// Declares an enum as a constant table.
    pub fn register_enum(&mut self, domain: &str, name: &str, values: Map<String, Value>) {
        self.enums.insert(format!("{domain}.{name}"), values);
        self.initialized = true;
    }

    /// Registers everything a protocol description declares.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`](crate::Error::Schema) on an unusable
    /// parameter type. Domains registered before the failure stay
    /// registered.
    pub fn load_protocol(&mut self, descriptor: &ProtocolDescriptor) -> Result<()> {
        descriptor.register(self)?;
        debug!(domains = descriptor.domains.len(), "Protocol loaded");
        Ok(())
    }
}

// ============================================================================
// Queries
// ============================================================================

impl Registry {
    /// Returns `true` once anything has been registered.
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns every domain with commands or events, sorted.
    #[must_use]
    pub fn domains(&self) -> Vec<&str> {
        let mut domains: Vec<&str> = self
            .agents
            .keys()
            .chain(self.dispatchers.keys())
            .map(String::as_str)
            .collect();
        domains.sort_unstable();
        domains.dedup();
        domains
    }

    /// Returns a declared command.
    #[must_use]
    pub fn command(&self, domain: &str, command: &str) -> Option<&CommandSpec> {
        self.agents.get(domain)?.command(command)
    }

    /// Returns the field order of a declared event.
    #[must_use]
    pub fn event_fields(&self, domain: &str, event: &str) -> Option<&[String]> {
        self.dispatchers
            .get(domain)?
            .fields(&format!("{domain}.{event}"))
    }

    /// Returns the constant table of a declared enum.
    #[must_use]
    pub fn enum_values(&self, domain: &str, name: &str) -> Option<&Map<String, Value>> {
        self.enums.get(&format!("{domain}.{name}"))
    }
}

// ============================================================================
// Connections
// ============================================================================

impl Registry {
    /// Builds a connection over `transport` with default options.
    #[must_use]
    pub fn connect(&self, transport: impl Transport + 'static) -> Connection {
        self.connect_with_options(transport, Options::default())
    }

    /// Builds a connection over `transport`.
    #[must_use]
    pub fn connect_with_options(
        &self,
        transport: impl Transport + 'static,
        options: Options,
    ) -> Connection {
        Connection::new(
            Arc::new(transport),
            self.agents.clone(),
            self.dispatchers.clone(),
            options,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
