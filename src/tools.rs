//! Tool declarations offered to the model session.
//!
//! Declarations are pure data: the remote model decides when to invoke a tool, and the
//! session framework executes it and feeds results back. Nothing in this crate runs a
//! tool locally.

use serde::Serialize;
use serde_json::{Value, json};

/// A named external capability the model session may invoke during a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDeclaration {
    name: String,
    schema: Value,
}

impl ToolDeclaration {
    /// Declare a capability with an opaque, service-defined schema.
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// The web-search capability backed by the model service's built-in search.
    ///
    /// The empty schema is the service's own wire shape for "enable this built-in".
    pub fn web_search() -> Self {
        Self::new("google_search", json!({}))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// The declaration in the session wire shape: `{"<name>": <schema>}`.
    pub fn to_wire(&self) -> Value {
        let mut wire = serde_json::Map::new();
        wire.insert(self.name.clone(), self.schema.clone());
        Value::Object(wire)
    }
}
