//! Per-pad shared schema registry.
//!
//! Registry entries live under `scratchpad.metadata.schemas.<logical-name>`.
//! Entries may arrive as `{id?, description?, schema}` objects, bare schema
//! objects, or JSON strings; normalization coerces all three and drops
//! anything that does not decode to an object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

/// Canonical registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub schema: Map<String, Value>,
}

impl SchemaEntry {
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "schema": Value::Object(self.schema.clone()),
        })
    }
}

/// Normalize a raw `schemas` metadata value into canonical entries keyed by
/// logical name. Malformed entries are skipped with a warning log.
pub fn normalize_schema_registry(raw: Option<&Value>) -> Vec<SchemaEntry> {
    let Some(Value::Object(map)) = raw else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for (name, value) in map {
        match normalize_entry(name, value) {
            Some(entry) => entries.push(entry),
            None => warn!(schema = %name, "skipping malformed shared schema entry"),
        }
    }
    entries
}

fn normalize_entry(name: &str, raw: &Value) -> Option<SchemaEntry> {
    let (schema_candidate, id, description) = match raw {
        Value::Object(map) if map.contains_key("schema") => (
            map.get("schema")?.clone(),
            map.get("id").and_then(Value::as_str).map(str::to_string),
            map.get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        Value::Object(_) => (raw.clone(), None, String::new()),
        Value::String(_) => (raw.clone(), None, String::new()),
        _ => return None,
    };

    let schema = coerce_schema_object(&schema_candidate)?;
    let id = match id {
        Some(id) if !id.is_empty() => id,
        _ => Uuid::new_v4().simple().to_string(),
    };

    Some(SchemaEntry {
        id,
        name: name.to_string(),
        description,
        schema,
    })
}

/// Coerce a schema value (object or JSON string) into an object.
pub fn coerce_schema_object(raw: &Value) -> Option<Map<String, Value>> {
    match raw {
        Value::Object(map) => Some(map.clone()),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) | Err(_) => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_full_entry() {
        let raw = json!({
            "report": {"id": "abc", "description": "Report shape", "schema": {"type": "object"}}
        });
        let entries = normalize_schema_registry(Some(&raw));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "report");
        assert_eq!(entries[0].id, "abc");
        assert_eq!(entries[0].schema["type"], "object");
    }

    #[test]
    fn bare_schema_object_gets_generated_id() {
        let raw = json!({"loose": {"type": "string"}});
        let entries = normalize_schema_registry(Some(&raw));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].schema["type"], "string");
        assert_eq!(entries[0].id.len(), 32);
    }

    #[test]
    fn json_string_entry_is_parsed() {
        let raw = json!({"inline": "{\"type\": \"number\"}"});
        let entries = normalize_schema_registry(Some(&raw));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].schema["type"], "number");
    }

    #[test]
    fn malformed_entries_are_dropped() {
        let raw = json!({
            "bad_number": 42,
            "bad_string": "not json",
            "good": {"type": "object"}
        });
        let entries = normalize_schema_registry(Some(&raw));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "good");
    }

    #[test]
    fn non_object_registry_is_empty() {
        assert!(normalize_schema_registry(Some(&json!("nope"))).is_empty());
        assert!(normalize_schema_registry(None).is_empty());
    }
}
