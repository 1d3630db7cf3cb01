//! Scratchpad type and metadata normalization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::cell::ScratchCell;
use super::schema_registry::{normalize_schema_registry, SchemaEntry};
use super::tags::{merge_tags, normalize_tags, tags_from_value};

/// Metadata keys with canonical handling: trimmed on write, surfaced on
/// listings and search snippets.
pub const CANONICAL_METADATA_FIELDS: &[&str] = &["title", "description", "summary"];

/// A UUID-addressed, ordered container of typed cells with metadata, tags,
/// and a per-pad shared schema registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scratchpad {
    pub scratch_id: String,
    #[serde(default)]
    pub cells: Vec<ScratchCell>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Scratchpad {
    /// Build a pad with normalized metadata.
    pub fn new(scratch_id: impl Into<String>, metadata: Map<String, Value>) -> Self {
        Self {
            scratch_id: scratch_id.into(),
            cells: Vec::new(),
            metadata: normalize_metadata(metadata),
        }
    }

    pub fn normalize(&mut self) {
        self.metadata = normalize_metadata(std::mem::take(&mut self.metadata));
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.get("namespace").and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").and_then(Value::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.metadata.get("description").and_then(Value::as_str)
    }

    pub fn summary(&self) -> Option<&str> {
        self.metadata.get("summary").and_then(Value::as_str)
    }

    /// Tags declared on pad metadata, excluding aggregated cell tags.
    pub fn declared_tags(&self) -> Vec<String> {
        tags_from_value(self.metadata.get("tags"))
    }

    /// Union of the cells' tag sets, computed at read time (never stored
    /// authoritatively).
    pub fn cell_tags(&self) -> Vec<String> {
        let per_cell: Vec<Vec<String>> = self.cells.iter().map(|c| c.tags()).collect();
        merge_tags(per_cell.iter().map(|t| t.as_slice()))
    }

    /// Declared pad tags merged with aggregated cell tags.
    pub fn aggregated_tags(&self) -> Vec<String> {
        let declared = self.declared_tags();
        let cells = self.cell_tags();
        merge_tags([declared.as_slice(), cells.as_slice()])
    }

    /// Canonical entries from `metadata.schemas`.
    pub fn schema_registry(&self) -> Vec<SchemaEntry> {
        normalize_schema_registry(self.metadata.get("schemas"))
    }

    /// Replace the registry with canonical entries keyed by logical name.
    pub fn set_schema_registry(&mut self, entries: &[SchemaEntry]) {
        if entries.is_empty() {
            self.metadata.remove("schemas");
            return;
        }
        let mut map = Map::new();
        for entry in entries {
            map.insert(entry.name.clone(), entry.to_value());
        }
        self.metadata.insert("schemas".into(), Value::Object(map));
    }

    /// Look up a cell position by id.
    pub fn position_of(&self, cell_id: &str) -> Option<usize> {
        self.cells.iter().position(|c| c.cell_id == cell_id)
    }

    /// Renumber indices to the contiguous range `[0, len)`.
    pub fn renumber(&mut self) {
        for (index, cell) in self.cells.iter_mut().enumerate() {
            cell.index = index;
        }
    }

    /// Response payload. `include_content` distinguishes full reads from the
    /// lightweight views returned by mutations; `include_metadata=false`
    /// drops the open metadata map but keeps canonical fields.
    pub fn to_response_value(&self, include_metadata: bool, include_content: bool) -> Value {
        let cells: Vec<Value> = self
            .cells
            .iter()
            .map(|cell| {
                if include_content {
                    cell.to_content_value()
                } else {
                    cell.to_listing_value()
                }
            })
            .collect();

        let mut payload = serde_json::json!({
            "scratch_id": self.scratch_id,
            "cells": cells,
            "cell_count": self.cells.len(),
        });

        let tags = self.aggregated_tags();
        if !tags.is_empty() {
            payload["tags"] = Value::from(tags);
        }
        let cell_tags = self.cell_tags();
        if !cell_tags.is_empty() {
            payload["cell_tags"] = Value::from(cell_tags);
        }
        if let Some(namespace) = self.namespace() {
            payload["namespace"] = Value::String(namespace.to_string());
        }
        for field in CANONICAL_METADATA_FIELDS {
            if let Some(value) = self.metadata.get(*field) {
                payload[*field] = value.clone();
            }
        }
        if include_metadata && !self.metadata.is_empty() {
            payload["metadata"] = Value::Object(self.metadata.clone());
        }
        payload
    }
}

/// Normalize pad metadata: trim canonical fields, normalize tags and
/// namespace, canonicalize the schema registry, and drop the synthesized
/// `cell_tags` key (it is recomputed from cells on every read).
pub fn normalize_metadata(metadata: Map<String, Value>) -> Map<String, Value> {
    let mut normalized = metadata;
    normalized.remove("cell_tags");

    let registry = normalize_schema_registry(normalized.get("schemas"));
    if registry.is_empty() {
        normalized.remove("schemas");
    } else {
        let mut map = Map::new();
        for entry in &registry {
            map.insert(entry.name.clone(), entry.to_value());
        }
        normalized.insert("schemas".into(), Value::Object(map));
    }

    let tags = tags_from_value(normalized.get("tags"));
    if tags.is_empty() {
        normalized.remove("tags");
    } else {
        normalized.insert("tags".into(), Value::from(normalize_tags(&tags)));
    }

    let namespace = normalized.get("namespace").cloned();
    match namespace {
        Some(Value::String(value)) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                normalized.remove("namespace");
            } else {
                normalized.insert("namespace".into(), Value::String(trimmed));
            }
        }
        Some(_) => {
            normalized.remove("namespace");
        }
        None => {}
    }

    for field in CANONICAL_METADATA_FIELDS {
        let trimmed = match normalized.get(*field) {
            Some(Value::String(value)) => value.trim().to_string(),
            Some(Value::Null) | None => continue,
            Some(other) => other.to_string().trim_matches('"').trim().to_string(),
        };
        if trimmed.is_empty() {
            normalized.remove(*field);
        } else {
            normalized.insert((*field).into(), Value::String(trimmed));
        }
    }

    normalized
}

/// Lean listing row for `scratch_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadListing {
    pub scratch_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub namespace: Option<String>,
    pub cell_count: usize,
}
