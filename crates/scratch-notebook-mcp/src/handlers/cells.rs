//! Cell mutation and validation tools: append, replace, validate.

use std::sync::Arc;

use serde_json::{json, Value};

use scratch_notebook_core::{ScratchError, ScratchResult};
use scratch_notebook_storage::{select_cells, ReadFilter};

use super::Handlers;

impl Handlers {
    pub(super) async fn scratch_append_cell(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let scratch_id = Self::require_str(args, "scratch_id")?;
        let cell_payload = args
            .get("cell")
            .ok_or_else(|| ScratchError::validation("Missing required field: cell"))?;

        // current pad state supplies the schema registry and the next index
        let store = Arc::clone(&self.state.store);
        let tenant_owned = tenant.to_string();
        let lookup_id = scratch_id.clone();
        let current = tokio::task::spawn_blocking(move || {
            store.read_pad(&tenant_owned, &lookup_id, &ReadFilter::default())
        })
        .await
        .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        let cell = Self::build_cell(cell_payload, current.cells.len())?;
        let validation_results = if cell.validate {
            self.validate_advisory(vec![cell.clone()], &current.schema_registry())
                .await?
        } else {
            Vec::new()
        };

        let store = Arc::clone(&self.state.store);
        let search = Arc::clone(&self.state.search);
        let tenant_owned = tenant.to_string();
        let lookup_id = scratch_id.clone();
        let pad = tokio::task::spawn_blocking(move || {
            store.append_cell(&tenant_owned, &lookup_id, cell, search.as_ref())
        })
        .await
        .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        let mut payload = Self::pad_payload(&pad, true, false);
        if !validation_results.is_empty() {
            payload["validation_results"] = serde_json::to_value(&validation_results)
                .map_err(|_| ScratchError::internal("Response serialization failed"))?;
        }
        self.record_operation("append");
        Ok(payload)
    }

    pub(super) async fn scratch_replace_cell(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let scratch_id = Self::require_str(args, "scratch_id")?;
        let cell_id = Self::require_str(args, "cell_id")?;
        let cell_payload = args
            .get("cell")
            .ok_or_else(|| ScratchError::validation("Missing required field: cell"))?;
        let new_index = Self::optional_limit(args, "new_index")?;

        let store = Arc::clone(&self.state.store);
        let tenant_owned = tenant.to_string();
        let lookup_id = scratch_id.clone();
        let current = tokio::task::spawn_blocking(move || {
            store.read_pad(&tenant_owned, &lookup_id, &ReadFilter::default())
        })
        .await
        .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        let position = current.position_of(&cell_id).ok_or_else(|| {
            ScratchError::not_found(format!("Cell id {cell_id} not found"))
                .with_details(json!({ "cell_id": cell_id }))
        })?;

        let mut cell = Self::build_cell(cell_payload, position)?;
        cell.cell_id = cell_id.clone();
        // absent metadata inherits the existing cell's metadata
        if cell_payload.get("metadata").is_none() && cell_payload.get("tags").is_none() {
            cell.metadata = current.cells[position].metadata.clone();
        }

        let validation_results = if cell.validate {
            self.validate_advisory(vec![cell.clone()], &current.schema_registry())
                .await?
        } else {
            Vec::new()
        };

        let store = Arc::clone(&self.state.store);
        let search = Arc::clone(&self.state.search);
        let tenant_owned = tenant.to_string();
        let lookup_id = scratch_id.clone();
        let pad = tokio::task::spawn_blocking(move || {
            store.replace_cell(
                &tenant_owned,
                &lookup_id,
                &cell_id,
                cell,
                new_index,
                search.as_ref(),
            )
        })
        .await
        .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        let mut payload = Self::pad_payload(&pad, true, false);
        if !validation_results.is_empty() {
            payload["validation_results"] = serde_json::to_value(&validation_results)
                .map_err(|_| ScratchError::internal("Response serialization failed"))?;
        }
        self.record_operation("replace");
        Ok(payload)
    }

    pub(super) async fn scratch_validate(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let scratch_id = Self::require_str(args, "scratch_id")?;
        let filter = ReadFilter {
            cell_ids: Self::string_filter(args, "cell_ids")?,
            ..Default::default()
        };

        let store = Arc::clone(&self.state.store);
        let tenant_owned = tenant.to_string();
        let lookup_id = scratch_id.clone();
        let pad = tokio::task::spawn_blocking(move || {
            store.read_pad(&tenant_owned, &lookup_id, &ReadFilter::default())
        })
        .await
        .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        let targets = select_cells(&pad, &filter)?;
        let results = self
            .validate_advisory(targets, &pad.schema_registry())
            .await?;

        self.record_operation("validate");
        Ok(json!({
            "scratch_id": scratch_id,
            "results": serde_json::to_value(&results)
                .map_err(|_| ScratchError::internal("Response serialization failed"))?,
        }))
    }
}
