//! Protocol descriptor loader.
//!
//! Reads the JSON protocol description published by inspector backends and
//! registers every domain's commands, events and enum types.
//!
//! # Format
//!
//! ```json
//! {
//!   "domains": [{
//!     "domain": "Net",
//!     "types": [{ "id": "Priority", "type": "string", "enum": ["low", "very-high"] }],
//!     "commands": [{
//!       "name": "fetch",
//!       "parameters": [{ "name": "url", "type": "string" }],
//!       "returns": [{ "name": "body", "type": "string" }]
//!     }],
//!     "events": [{ "name": "foo", "parameters": [{ "name": "a", "type": "integer" }] }]
//!   }]
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::runtime::Registry;

use super::{ParamSpec, ParamType};

// ============================================================================
// Descriptor Types
// ============================================================================

/// Root of a protocol description.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProtocolDescriptor {
    /// Declared domains.
    #[serde(default)]
    pub domains: Vec<DomainDescriptor>,
}

/// One domain of a protocol description.
#[derive(Debug, Clone, Deserialize)]
pub struct DomainDescriptor {
    /// Domain name.
    pub domain: String,

    /// Named types referenced by `$ref`.
    #[serde(default)]
    pub types: Vec<TypeDescriptor>,

    /// Commands in declaration order.
    #[serde(default)]
    pub commands: Vec<CommandDescriptor>,

    /// Events in declaration order.
    #[serde(default)]
    pub events: Vec<EventDescriptor>,
}

/// A named type.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeDescriptor {
    /// Type id, unqualified.
    pub id: String,

    /// Underlying protocol type.
    #[serde(rename = "type")]
    pub kind: String,

    /// Allowed values for string enums.
    #[serde(rename = "enum", default)]
    pub values: Option<Vec<String>>,
}

/// A command declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandDescriptor {
    /// Command name, unqualified.
    pub name: String,

    /// Parameters in call order.
    #[serde(default)]
    pub parameters: Vec<PropertyDescriptor>,

    /// Result fields in reply order.
    #[serde(default)]
    pub returns: Vec<PropertyDescriptor>,

    /// Present when failures carry structured data.
    #[serde(default)]
    pub error: Option<Value>,
}

/// An event declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct EventDescriptor {
    /// Event name, unqualified.
    pub name: String,

    /// Fields in handler argument order.
    #[serde(default)]
    pub parameters: Vec<PropertyDescriptor>,
}

/// A parameter, return value or event field.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyDescriptor {
    /// Property name.
    pub name: String,

    /// Inline protocol type.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    /// Reference to a named type (`Type` or `Domain.Type`).
    #[serde(rename = "$ref", default)]
    pub reference: Option<String>,

    /// Whether the property may be absent.
    #[serde(default)]
    pub optional: bool,
}

// ============================================================================
// ProtocolDescriptor
// ============================================================================

impl ProtocolDescriptor {
    /// Parses a protocol description from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the text is not a valid description.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Registers every domain with `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if a parameter declares neither `type` nor
    /// `$ref`, or uses an unsupported type.
    pub fn register(&self, registry: &mut Registry) -> Result<()> {
        let types = self.type_table();

        for domain in &self.domains {
            for declared in &domain.types {
                if let Some(values) = &declared.values {
                    registry.register_enum(&domain.domain, &declared.id, enum_table(values));
                }
            }

            for command in &domain.commands {
                let params = command
                    .parameters
                    .iter()
                    .map(|param| {
                        let param_type = resolve_type(&domain.domain, param, &types)?;
                        Ok(ParamSpec {
                            name: param.name.clone(),
                            param_type,
                            optional: param.optional,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                let reply_fields = command.returns.iter().map(|r| r.name.clone()).collect();

                registry.register_command(
                    &domain.domain,
                    &command.name,
                    params,
                    reply_fields,
                    command.error.is_some(),
                );
            }

            for event in &domain.events {
                let fields = event.parameters.iter().map(|p| p.name.clone()).collect();
                registry.register_event(&domain.domain, &event.name, fields);
            }

            debug!(
                domain = %domain.domain,
                commands = domain.commands.len(),
                events = domain.events.len(),
                "Domain registered"
            );
        }

        Ok(())
    }

    /// Maps qualified type ids to their underlying protocol type.
    fn type_table(&self) -> FxHashMap<String, &str> {
        self.domains
            .iter()
            .flat_map(|domain| {
                domain
                    .types
                    .iter()
                    .map(move |t| (format!("{}.{}", domain.domain, t.id), t.kind.as_str()))
            })
            .collect()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolves the primitive type of a parameter.
fn resolve_type(
    domain: &str,
    param: &PropertyDescriptor,
    types: &FxHashMap<String, &str>,
) -> Result<ParamType> {
    if let Some(kind) = &param.kind {
        return kind.parse();
    }

    let reference = param.reference.as_deref().ok_or_else(|| {
        Error::schema(format!(
            "parameter '{}' in domain '{domain}' has neither type nor $ref",
            param.name
        ))
    })?;

    let qualified = if reference.contains('.') {
        reference.to_string()
    } else {
        format!("{domain}.{reference}")
    };

    match types.get(&qualified) {
        Some(kind) => kind.parse(),
        None => {
            warn!(reference = %qualified, "Unresolved type reference, treating as object");
            Ok(ParamType::Object)
        }
    }
}

/// Builds the constant table of an enum type.
fn enum_table(values: &[String]) -> Map<String, Value> {
    values
        .iter()
        .map(|value| (enum_key(value), Value::String(value.clone())))
        .collect()
}

/// Converts an enum value to its UpperCamelCase key.
fn enum_key(value: &str) -> String {
    value
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PROTOCOL: &str = r#"{
        "domains": [
            {
                "domain": "Net",
                "types": [
                    { "id": "RequestId", "type": "string" },
                    { "id": "Priority", "type": "string", "enum": ["low", "very-high"] }
                ],
                "commands": [
                    {
                        "name": "fetch",
                        "parameters": [
                            { "name": "url", "type": "string" },
                            { "name": "priority", "$ref": "Priority", "optional": true },
                            { "name": "headers", "type": "array", "optional": true }
                        ],
                        "returns": [ { "name": "body", "type": "string" } ]
                    },
                    {
                        "name": "replay",
                        "parameters": [ { "name": "requestId", "$ref": "RequestId" } ],
                        "error": { "$ref": "Page.ErrorInfo" }
                    },
                    {
                        "name": "attach",
                        "parameters": [ { "name": "target", "$ref": "Page.Target" } ]
                    }
                ],
                "events": [
                    {
                        "name": "foo",
                        "parameters": [
                            { "name": "a", "type": "integer" },
                            { "name": "b", "type": "integer" }
                        ]
                    }
                ]
            },
            {
                "domain": "Page",
                "types": [ { "id": "FrameId", "type": "string" } ],
                "commands": [
                    { "name": "reload", "parameters": [ { "name": "frame", "$ref": "Page.FrameId" } ] }
                ]
            }
        ]
    }"#;

    fn loaded() -> Registry {
        let descriptor = ProtocolDescriptor::from_json(PROTOCOL).expect("parse descriptor");
        let mut registry = Registry::new();
        descriptor.register(&mut registry).expect("register descriptor");
        registry
    }

    #[test]
    fn test_commands_registered() {
        let registry = loaded();
        let fetch = registry.command("Net", "fetch").expect("fetch registered");

        assert_eq!(
            fetch.params,
            vec![
                ParamSpec::required("url", ParamType::String),
                ParamSpec::optional("priority", ParamType::String),
                ParamSpec::optional("headers", ParamType::Object),
            ]
        );
        assert_eq!(fetch.reply_fields, vec!["body".to_string()]);
        assert!(!fetch.has_error_data);
    }

    #[test]
    fn test_error_data_flag_and_local_ref() {
        let registry = loaded();
        let replay = registry.command("Net", "replay").expect("replay registered");
        assert!(replay.has_error_data);
        assert_eq!(replay.params[0].param_type, ParamType::String);
    }

    #[test]
    fn test_cross_domain_ref() {
        let registry = loaded();
        let reload = registry.command("Page", "reload").expect("reload registered");
        assert_eq!(reload.params[0].param_type, ParamType::String);
    }

    #[test]
    fn test_unresolved_ref_falls_back_to_object() {
        let registry = loaded();
        let attach = registry.command("Net", "attach").expect("attach registered");
        assert_eq!(attach.params[0].param_type, ParamType::Object);
    }

    #[test]
    fn test_events_registered() {
        let registry = loaded();
        assert_eq!(
            registry.event_fields("Net", "foo"),
            Some(&["a".to_string(), "b".to_string()][..])
        );
        assert!(registry.event_fields("Page", "foo").is_none());
    }

    #[test]
    fn test_enums_registered() {
        let registry = loaded();
        let priority = registry.enum_values("Net", "Priority").expect("enum registered");
        assert_eq!(priority.get("Low"), Some(&json!("low")));
        assert_eq!(priority.get("VeryHigh"), Some(&json!("very-high")));
        assert!(registry.enum_values("Net", "RequestId").is_none());
    }

    #[test]
    fn test_missing_type_is_schema_error() {
        let descriptor = ProtocolDescriptor::from_json(
            r#"{"domains": [{"domain": "X", "commands": [{"name": "c", "parameters": [{"name": "p"}]}]}]}"#,
        )
        .expect("parse descriptor");
        let mut registry = Registry::new();

        let err = descriptor.register(&mut registry).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn test_enum_key() {
        assert_eq!(enum_key("very-high"), "VeryHigh");
        assert_eq!(enum_key("DOMContentLoaded"), "DOMContentLoaded");
        assert_eq!(enum_key("x"), "X");
    }
}
