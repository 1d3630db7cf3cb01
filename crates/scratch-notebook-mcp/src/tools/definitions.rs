//! Tool definitions for the scratch notebook surface.
//!
//! Input schemas mirror the tool contracts: mutations address cells by
//! `cell_id`, filters are arrays of non-empty strings, and `scratch_create`
//! documents the canonical metadata fields so assistants fill them in.

use serde_json::json;

use super::types::ToolDefinition;
use super::names;

fn string_array(description: &str) -> serde_json::Value {
    json!({
        "type": "array",
        "items": {"type": "string", "minLength": 1},
        "description": description,
    })
}

fn cell_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "cell_id": {
                "type": "string",
                "description": "Optional client-supplied cell id; server-assigned when omitted."
            },
            "language": {
                "type": "string",
                "minLength": 1,
                "description": format!(
                    "Cell language; controls which validator runs. Known languages: {}. \
                     Anything else is stored verbatim and never validated.",
                    scratch_notebook_core::CellLanguage::all().join(", ")
                ),
            },
            "content": {"type": "string", "description": "Cell content (UTF-8)."},
            "validate": {
                "type": "boolean",
                "default": false,
                "description": "Run advisory validation on write; diagnostics never block the write."
            },
            "json_schema": {
                "description": "Inline JSON Schema object, a JSON string, or a scratchpad://schemas/<name> reference.",
                "anyOf": [{"type": "object"}, {"type": "string"}, {"type": "null"}]
            },
            "metadata": {"type": "object", "description": "Open metadata map; 'tags' aggregates into the pad's cell_tags."},
            "tags": string_array("Convenience alias merged into metadata.tags."),
        },
        "required": ["language", "content"],
    })
}

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            names::SCRATCH_CREATE,
            "Create a scratch notebook.\n\n\
             Provide metadata.title (concise, <=60 chars), metadata.description (one or two \
             sentences), and optionally metadata.summary for search snippets. \
             metadata.namespace groups pads per tenant; call scratch_namespace_list first and \
             reuse existing namespaces rather than inventing new ones. Optional initial cells \
             are appended in order.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "scratch_id": {
                        "type": "string",
                        "description": "Optional deterministic identifier ([A-Za-z0-9_-], max 128); omit to auto-generate."
                    },
                    "metadata": {
                        "type": "object",
                        "description": "Pad metadata including canonical fields (title, description, summary, namespace, tags)."
                    },
                    "cells": {
                        "type": "array",
                        "items": cell_schema(),
                        "description": "Optional initial cells, appended in order."
                    },
                },
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_READ,
            "Read a scratch notebook by id, including cell content.\n\n\
             Filters: cell_ids restricts to explicit cell ids (request order preserved); tags \
             keeps cells whose tag set intersects; namespaces asserts the pad belongs to one of \
             the listed namespaces; include_metadata=false drops the open metadata map.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "scratch_id": {"type": "string", "minLength": 1},
                    "cell_ids": string_array("Optional subset of cell ids to return."),
                    "tags": string_array("Optional tag filter for cells."),
                    "namespaces": string_array("Optional namespace assertion for the pad."),
                    "include_metadata": {"type": "boolean", "default": true},
                },
                "required": ["scratch_id"],
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_LIST,
            "List scratchpads with lean metadata for navigation: scratch_id, title, \
             description, namespace, cell_count. Use scratch_read for content.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "namespaces": string_array("Optional namespace filter (OR within the list)."),
                    "tags": string_array("Optional tag filter matching pad or cell tags."),
                    "limit": {"type": "integer", "minimum": 0, "description": "Optional result cap, applied after filtering."},
                },
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_LIST_CELLS,
            "List cells for a scratch notebook without content: cell_id, index, language, tags, metadata.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "scratch_id": {"type": "string", "minLength": 1},
                    "cell_ids": string_array("Optional subset of cell ids."),
                    "tags": string_array("Optional tag filter."),
                },
                "required": ["scratch_id"],
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_APPEND_CELL,
            "Append a cell to a scratch notebook. Returns the lightweight pad view plus \
             validation results when cell.validate is true.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "scratch_id": {"type": "string", "minLength": 1},
                    "cell": cell_schema(),
                },
                "required": ["scratch_id", "cell"],
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_REPLACE_CELL,
            "Replace the cell addressed by cell_id. new_index moves the cell; remaining cells \
             keep their relative order and indices stay contiguous.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "scratch_id": {"type": "string", "minLength": 1},
                    "cell_id": {"type": "string", "minLength": 1},
                    "cell": cell_schema(),
                    "new_index": {"type": "integer", "minimum": 0, "description": "Optional target position."},
                },
                "required": ["scratch_id", "cell_id", "cell"],
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_DELETE,
            "Delete a scratch notebook by id. Idempotent: deleting a missing pad reports deleted=false.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "scratch_id": {"type": "string", "minLength": 1},
                },
                "required": ["scratch_id"],
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_VALIDATE,
            "Validate cells of a scratch notebook. Diagnostics are advisory; the request only \
             fails when the validation deadline expires.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "scratch_id": {"type": "string", "minLength": 1},
                    "cell_ids": string_array("Optional subset of cell ids to validate."),
                },
                "required": ["scratch_id"],
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_SEARCH,
            "Semantic search across scratchpads and cells. Namespace and tag filters are \
             applied before ranking truncates to the limit.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "query": {"type": "string", "minLength": 1},
                    "namespaces": string_array("Optional namespace filter applied before ranking."),
                    "tags": string_array("Optional tag filter applied before ranking."),
                    "limit": {"type": "integer", "minimum": 1, "description": "Maximum hits to return."},
                },
                "required": ["query"],
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_LIST_TAGS,
            "List scratchpad-level and cell-level tags, optionally filtered by namespace.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "namespaces": string_array("Optional namespace filter."),
                },
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_UPSERT_SCHEMA,
            "Create or update a shared schema on a scratch notebook. The schema payload must \
             be a structurally valid JSON Schema.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "scratch_id": {"type": "string", "minLength": 1},
                    "schema": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "id": {"type": "string", "description": "Existing schema UUID when updating; omit for new schemas."},
                            "name": {"type": "string", "description": "Logical key used in scratchpad:// references; defaults to the id."},
                            "description": {"type": "string", "default": ""},
                            "schema": {"type": "object", "description": "JSON Schema object."},
                        },
                        "required": ["schema"],
                    },
                },
                "required": ["scratch_id", "schema"],
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_GET_SCHEMA,
            "Fetch a shared schema definition by id.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "scratch_id": {"type": "string", "minLength": 1},
                    "schema_id": {"type": "string", "minLength": 1},
                },
                "required": ["scratch_id", "schema_id"],
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_LIST_SCHEMAS,
            "List shared schemas attached to a scratch notebook.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "scratch_id": {"type": "string", "minLength": 1},
                },
                "required": ["scratch_id"],
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_NAMESPACE_LIST,
            "List namespaces available to the current tenant with scratchpad counts.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {},
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_NAMESPACE_CREATE,
            "Register a namespace for the current tenant.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "namespace": {"type": "string", "minLength": 1},
                },
                "required": ["namespace"],
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_NAMESPACE_RENAME,
            "Rename a namespace. migrate_scratchpads (default true) moves member pads in the \
             same commit; renaming a populated namespace without migration is a conflict.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "old_namespace": {"type": "string", "minLength": 1},
                    "new_namespace": {"type": "string", "minLength": 1},
                    "migrate_scratchpads": {"type": "boolean", "default": true},
                },
                "required": ["old_namespace", "new_namespace"],
            }),
        ),
        ToolDefinition::new(
            names::SCRATCH_NAMESPACE_DELETE,
            "Delete a namespace. delete_scratchpads (default false) cascades to member pads; \
             deleting a populated namespace without the cascade is a conflict.",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "namespace": {"type": "string", "minLength": 1},
                    "delete_scratchpads": {"type": "boolean", "default": false},
                },
                "required": ["namespace"],
            }),
        ),
    ]
}
