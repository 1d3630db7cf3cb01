//! Shared schema registry tools.

use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use scratch_notebook_core::{ScratchError, ScratchResult};
use scratch_notebook_storage::SchemaUpsert;

use super::Handlers;

impl Handlers {
    pub(super) async fn scratch_upsert_schema(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let scratch_id = Self::require_str(args, "scratch_id")?;
        let upsert = coerce_schema_request(
            args.get("schema")
                .ok_or_else(|| ScratchError::validation("Missing required field: schema"))?,
        )?;

        let store = Arc::clone(&self.state.store);
        let search = Arc::clone(&self.state.search);
        let tenant_owned = tenant.to_string();
        let lookup_id = scratch_id.clone();
        let entry = tokio::task::spawn_blocking(move || {
            store.upsert_schema(&tenant_owned, &lookup_id, upsert, search.as_ref())
        })
        .await
        .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        self.record_operation("upsert_schema");
        Ok(json!({ "schema": entry.to_value() }))
    }

    pub(super) async fn scratch_get_schema(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let scratch_id = Self::require_str(args, "scratch_id")?;
        let schema_id = normalize_schema_id(&Self::require_str(args, "schema_id")?)?;

        let store = Arc::clone(&self.state.store);
        let tenant_owned = tenant.to_string();
        let entry = tokio::task::spawn_blocking(move || {
            store.get_schema(&tenant_owned, &scratch_id, &schema_id)
        })
        .await
        .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        Ok(json!({ "schema": entry.to_value() }))
    }

    pub(super) async fn scratch_list_schemas(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let scratch_id = Self::require_str(args, "scratch_id")?;

        let store = Arc::clone(&self.state.store);
        let tenant_owned = tenant.to_string();
        let lookup_id = scratch_id.clone();
        let entries =
            tokio::task::spawn_blocking(move || store.list_schemas(&tenant_owned, &lookup_id))
                .await
                .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        let schemas: Vec<Value> = entries.iter().map(|e| e.to_value()).collect();
        Ok(json!({ "scratch_id": scratch_id, "schemas": schemas }))
    }
}

/// Validate the upsert payload shape: `schema` must be a structurally valid
/// JSON Schema object; `id`, when present, must be a UUID.
fn coerce_schema_request(payload: &Value) -> ScratchResult<SchemaUpsert> {
    let Some(object) = payload.as_object() else {
        return Err(ScratchError::validation("Schema request must be an object"));
    };

    let Some(Value::Object(schema)) = object.get("schema") else {
        return Err(ScratchError::validation(
            "Schema request must include a JSON object under 'schema'",
        ));
    };
    // structural check only; a malformed schema is the one cell-independent
    // failure that rejects the request
    jsonschema::validator_for(&Value::Object(schema.clone()))
        .map_err(|_| ScratchError::validation("Invalid JSON schema"))?;

    let description = match object.get("description") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(_) => {
            return Err(ScratchError::validation("Schema description must be a string"))
        }
    };

    let name = object
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string);
    let id = match object.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => Some(normalize_schema_id(raw)?),
        Some(_) => return Err(ScratchError::validation("Schema id must be a UUID string")),
    };

    Ok(SchemaUpsert {
        id,
        name,
        description,
        schema: schema.clone(),
    })
}

/// Schema ids are UUIDs, stored and compared in simple (32 hex) form.
fn normalize_schema_id(raw: &str) -> ScratchResult<String> {
    Uuid::parse_str(raw.trim())
        .map(|uuid| uuid.simple().to_string())
        .map_err(|_| ScratchError::validation("Schema id must be a UUID string"))
}
