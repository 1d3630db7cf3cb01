//! Pad lifecycle tools: create, read, list, list_cells, delete.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use scratch_notebook_core::{ScratchError, ScratchResult, Scratchpad};
use scratch_notebook_storage::{select_cells, CatalogStore, ReadFilter};

use super::Handlers;

impl Handlers {
    pub(super) async fn scratch_create(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let metadata = match args.get("metadata") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(ScratchError::validation("Metadata must be an object")),
        };

        let mut pad = match args.get("scratch_id").and_then(Value::as_str) {
            Some(scratch_id) => {
                CatalogStore::validate_identifier(scratch_id)?;
                Scratchpad::new(scratch_id, metadata)
            }
            None => {
                let scratch_id = self.generate_scratch_id(tenant).await?;
                Scratchpad::new(scratch_id, metadata)
            }
        };

        if let Some(cells) = args.get("cells") {
            let Some(items) = cells.as_array() else {
                return Err(ScratchError::validation("Cells must be an array"));
            };
            for (index, item) in items.iter().enumerate() {
                let cell = Self::build_cell(item, index)?;
                if pad.position_of(&cell.cell_id).is_some() {
                    return Err(ScratchError::invalid_id(format!(
                        "Cell id {} already exists",
                        cell.cell_id
                    )));
                }
                pad.cells.push(cell);
            }
        }

        // advisory validation runs before the commit so a deadline expiry
        // rejects the whole request with no partial state
        let registry = pad.schema_registry();
        let to_validate: Vec<_> = pad.cells.iter().filter(|c| c.validate).cloned().collect();
        let validation_results = self.validate_advisory(to_validate, &registry).await?;

        let store = Arc::clone(&self.state.store);
        let search = Arc::clone(&self.state.search);
        let tenant_owned = tenant.to_string();
        let (pad, evicted) =
            tokio::task::spawn_blocking(move || store.create_pad(&tenant_owned, pad, search.as_ref()))
                .await
                .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        if !evicted.is_empty() {
            self.state
                .metrics
                .record_evictions(self.state.config.eviction_policy.as_str(), evicted.len());
        }

        let mut payload = Self::pad_payload(&pad, true, false);
        if !evicted.is_empty() {
            payload["evicted_scratchpads"] = Value::from(evicted);
        }
        if !validation_results.is_empty() {
            payload["validation_results"] = serde_json::to_value(&validation_results)
                .map_err(|_| ScratchError::internal("Response serialization failed"))?;
        }
        self.record_operation("create");
        Ok(payload)
    }

    pub(super) async fn scratch_read(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let scratch_id = Self::require_str(args, "scratch_id")?;
        let include_metadata = Self::optional_bool(args, "include_metadata", true)?;
        let filter = ReadFilter {
            cell_ids: Self::string_filter(args, "cell_ids")?,
            tags: Self::string_filter(args, "tags")?,
            namespaces: Self::string_filter(args, "namespaces")?,
        };

        let store = Arc::clone(&self.state.store);
        let tenant_owned = tenant.to_string();
        let namespace_filter = ReadFilter {
            namespaces: filter.namespaces.clone(),
            ..Default::default()
        };
        let pad = tokio::task::spawn_blocking(move || {
            store.read_pad(&tenant_owned, &scratch_id, &namespace_filter)
        })
        .await
        .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        let selected = select_cells(&pad, &filter)?;
        let view = Scratchpad {
            scratch_id: pad.scratch_id.clone(),
            cells: selected,
            metadata: pad.metadata.clone(),
        };

        self.record_operation("read");
        Ok(Self::pad_payload(&view, include_metadata, true))
    }

    pub(super) async fn scratch_list(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let namespaces = Self::string_filter(args, "namespaces")?;
        let tags = Self::string_filter(args, "tags")?;
        let limit = Self::optional_limit(args, "limit")?;

        let store = Arc::clone(&self.state.store);
        let tenant_owned = tenant.to_string();
        let listings = tokio::task::spawn_blocking(move || {
            store.list_pads(
                &tenant_owned,
                namespaces.as_deref(),
                tags.as_deref(),
                limit,
            )
        })
        .await
        .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        self.record_operation("list");
        Ok(json!({ "scratchpads": listings }))
    }

    pub(super) async fn scratch_list_cells(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let scratch_id = Self::require_str(args, "scratch_id")?;
        let filter = ReadFilter {
            cell_ids: Self::string_filter(args, "cell_ids")?,
            tags: Self::string_filter(args, "tags")?,
            namespaces: None,
        };

        let store = Arc::clone(&self.state.store);
        let tenant_owned = tenant.to_string();
        let lookup_id = scratch_id.clone();
        let pad = tokio::task::spawn_blocking(move || {
            store.read_pad(&tenant_owned, &lookup_id, &ReadFilter::default())
        })
        .await
        .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        let cells: Vec<Value> = select_cells(&pad, &filter)?
            .iter()
            .map(|cell| cell.to_listing_value())
            .collect();

        Ok(json!({ "scratch_id": scratch_id, "cells": cells }))
    }

    pub(super) async fn scratch_delete(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let scratch_id = Self::require_str(args, "scratch_id")?;
        let store = Arc::clone(&self.state.store);
        let tenant_owned = tenant.to_string();
        let lookup_id = scratch_id.clone();
        let deleted =
            tokio::task::spawn_blocking(move || store.delete_pad(&tenant_owned, &lookup_id))
                .await
                .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        self.record_operation("delete");
        Ok(json!({ "scratch_id": scratch_id, "deleted": deleted }))
    }

    /// Generate a fresh `scratch-<12 hex>` identifier, avoiding collisions.
    async fn generate_scratch_id(&self, tenant: &str) -> ScratchResult<String> {
        let store = Arc::clone(&self.state.store);
        let tenant = tenant.to_string();
        tokio::task::spawn_blocking(move || {
            for _ in 0..64 {
                let candidate = format!("scratch-{}", &Uuid::new_v4().simple().to_string()[..12]);
                if !store.has_pad(&tenant, &candidate)? {
                    return Ok(candidate);
                }
            }
            Err(ScratchError::internal(
                "Unable to generate unique scratchpad id",
            ))
        })
        .await
        .map_err(|_| ScratchError::internal("Storage worker failed"))?
    }
}
