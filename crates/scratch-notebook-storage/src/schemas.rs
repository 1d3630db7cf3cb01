//! Per-pad schema registry operations.

use uuid::Uuid;

use scratch_notebook_core::{ScratchError, ScratchResult, SchemaEntry};

use crate::filter::ReadFilter;
use crate::store::CatalogStore;
use crate::PadEmbedder;

/// Upsert request for a registry entry. The handler has already verified the
/// schema payload is structurally a JSON Schema.
#[derive(Debug, Clone)]
pub struct SchemaUpsert {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: String,
    pub schema: serde_json::Map<String, serde_json::Value>,
}

impl CatalogStore {
    /// Create or update a registry entry on the pad. When the request names
    /// an existing entry id under a new logical name, the entry moves.
    pub fn upsert_schema(
        &self,
        tenant: &str,
        scratch_id: &str,
        upsert: SchemaUpsert,
        embedder: &dyn PadEmbedder,
    ) -> ScratchResult<SchemaEntry> {
        Self::validate_identifier(scratch_id)?;
        let _guard = self.write_lock.lock();

        let (record, mut pad) = self.load_pad_locked(tenant, scratch_id)?;
        let mut registry = pad.schema_registry();

        let desired_name = upsert
            .name
            .clone()
            .or_else(|| upsert.id.clone())
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ScratchError::validation("Schema entry missing name"))?;

        let entry_id = match &upsert.id {
            Some(id) => id.clone(),
            None => Uuid::new_v4().simple().to_string(),
        };

        // an existing entry with the same id moves to the new name
        if let Some(requested) = &upsert.id {
            let lowered = requested.to_lowercase();
            registry.retain(|entry| entry.id.to_lowercase() != lowered);
        }
        registry.retain(|entry| entry.name != desired_name);

        let entry = SchemaEntry {
            id: entry_id,
            name: desired_name,
            description: upsert.description,
            schema: upsert.schema,
        };
        registry.push(entry.clone());

        pad.set_schema_registry(&registry);
        self.commit_pad_update(tenant, record, pad, embedder)?;
        Ok(entry)
    }

    /// Fetch a registry entry by id (case-insensitive).
    pub fn get_schema(
        &self,
        tenant: &str,
        scratch_id: &str,
        schema_id: &str,
    ) -> ScratchResult<SchemaEntry> {
        let pad = self.read_pad(tenant, scratch_id, &ReadFilter::default())?;
        let lowered = schema_id.to_lowercase();
        pad.schema_registry()
            .into_iter()
            .find(|entry| entry.id.to_lowercase() == lowered)
            .ok_or_else(|| {
                ScratchError::not_found("Schema not found").with_details(serde_json::json!({
                    "scratch_id": scratch_id,
                    "schema_id": schema_id,
                }))
            })
    }

    /// All registry entries, sorted by `(description, name)` for stable
    /// listings.
    pub fn list_schemas(&self, tenant: &str, scratch_id: &str) -> ScratchResult<Vec<SchemaEntry>> {
        let pad = self.read_pad(tenant, scratch_id, &ReadFilter::default())?;
        let mut entries = pad.schema_registry();
        entries.sort_by(|a, b| {
            (a.description.to_lowercase(), a.name.clone())
                .cmp(&(b.description.to_lowercase(), b.name.clone()))
        });
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::super::store::tests::{make_pad, open_store};
    use super::*;
    use crate::NoopEmbedder;
    use scratch_notebook_core::{ErrorCode, EvictionPolicy};
    use serde_json::json;

    fn schema_map(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("schema fixtures must be objects"),
        }
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let (_dir, store) = open_store(EvictionPolicy::Discard);
        store
            .create_pad("default", make_pad("p", None), &NoopEmbedder)
            .unwrap();

        let entry = store
            .upsert_schema(
                "default",
                "p",
                SchemaUpsert {
                    id: Some("abc123".into()),
                    name: Some("report".into()),
                    description: "Report shape".into(),
                    schema: schema_map(json!({"type": "object"})),
                },
                &NoopEmbedder,
            )
            .unwrap();
        assert_eq!(entry.name, "report");

        let fetched = store.get_schema("default", "p", "ABC123").unwrap();
        assert_eq!(fetched.id, "abc123");
        assert_eq!(fetched.schema["type"], "object");
    }

    #[test]
    fn upsert_without_name_uses_id() {
        let (_dir, store) = open_store(EvictionPolicy::Discard);
        store
            .create_pad("default", make_pad("p", None), &NoopEmbedder)
            .unwrap();
        let entry = store
            .upsert_schema(
                "default",
                "p",
                SchemaUpsert {
                    id: Some("named-by-id".into()),
                    name: None,
                    description: String::new(),
                    schema: schema_map(json!({"type": "string"})),
                },
                &NoopEmbedder,
            )
            .unwrap();
        assert_eq!(entry.name, "named-by-id");
    }

    #[test]
    fn upsert_same_id_new_name_moves_entry() {
        let (_dir, store) = open_store(EvictionPolicy::Discard);
        store
            .create_pad("default", make_pad("p", None), &NoopEmbedder)
            .unwrap();
        for name in ["old-name", "new-name"] {
            store
                .upsert_schema(
                    "default",
                    "p",
                    SchemaUpsert {
                        id: Some("same-id".into()),
                        name: Some(name.into()),
                        description: String::new(),
                        schema: schema_map(json!({"type": "object"})),
                    },
                    &NoopEmbedder,
                )
                .unwrap();
        }
        let entries = store.list_schemas("default", "p").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "new-name");
    }

    #[test]
    fn upsert_without_name_or_id_is_validation_error() {
        let (_dir, store) = open_store(EvictionPolicy::Discard);
        store
            .create_pad("default", make_pad("p", None), &NoopEmbedder)
            .unwrap();
        let err = store
            .upsert_schema(
                "default",
                "p",
                SchemaUpsert {
                    id: None,
                    name: None,
                    description: String::new(),
                    schema: schema_map(json!({"type": "object"})),
                },
                &NoopEmbedder,
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn get_missing_schema_is_not_found() {
        let (_dir, store) = open_store(EvictionPolicy::Discard);
        store
            .create_pad("default", make_pad("p", None), &NoopEmbedder)
            .unwrap();
        let err = store.get_schema("default", "p", "ghost").unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn list_schemas_sorts_by_description_then_name() {
        let (_dir, store) = open_store(EvictionPolicy::Discard);
        store
            .create_pad("default", make_pad("p", None), &NoopEmbedder)
            .unwrap();
        for (name, description) in [("zeta", "Alpha desc"), ("alpha", "beta desc"), ("mid", "Alpha desc")] {
            store
                .upsert_schema(
                    "default",
                    "p",
                    SchemaUpsert {
                        id: None,
                        name: Some(name.into()),
                        description: description.into(),
                        schema: schema_map(json!({"type": "object"})),
                    },
                    &NoopEmbedder,
                )
                .unwrap();
        }
        let entries = store.list_schemas("default", "p").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["mid", "zeta", "alpha"]);
    }

    #[test]
    fn registry_persists_in_pad_metadata() {
        let (_dir, store) = open_store(EvictionPolicy::Discard);
        store
            .create_pad("default", make_pad("p", None), &NoopEmbedder)
            .unwrap();
        store
            .upsert_schema(
                "default",
                "p",
                SchemaUpsert {
                    id: None,
                    name: Some("kept".into()),
                    description: String::new(),
                    schema: schema_map(json!({"type": "object"})),
                },
                &NoopEmbedder,
            )
            .unwrap();
        let pad = store
            .read_pad("default", "p", &crate::filter::ReadFilter::default())
            .unwrap();
        assert!(pad.metadata["schemas"]["kept"].is_object());
    }
}
