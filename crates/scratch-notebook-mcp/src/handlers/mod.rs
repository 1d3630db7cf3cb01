//! Request handlers: MCP dispatch plus the tool implementations.
//!
//! Every tool handler receives the resolved tenant as an explicit argument
//! and passes it into each store/search call; there is no ambient tenant.
//! Mutating tools return lightweight pad views (never cell content) and a
//! failed call leaves the store byte-identical to its pre-call state.

mod cells;
mod namespaces;
mod pads;
mod schemas;
mod search;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use scratch_notebook_core::validation::{validate_cells, ValidationContext};
use scratch_notebook_core::{
    CellLanguage, ScratchCell, ScratchError, ScratchResult, Scratchpad, SchemaEntry,
    ValidationResult,
};

use crate::protocol::{error_codes, methods, JsonRpcId, JsonRpcRequest, JsonRpcResponse};
use crate::server::AppState;
use crate::tools::{get_tool_definitions, names};

/// MCP request handlers.
pub struct Handlers {
    pub(crate) state: Arc<AppState>,
}

impl Handlers {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Parse and dispatch a raw JSON-RPC line (stdio/SSE transports).
    pub async fn handle_request(&self, input: &str, principal: Option<&str>) -> JsonRpcResponse {
        let request: JsonRpcRequest = match serde_json::from_str(input) {
            Ok(request) => request,
            Err(err) => {
                return JsonRpcResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {err}"),
                );
            }
        };
        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::error(
                request.id,
                error_codes::INVALID_REQUEST,
                "Invalid JSON-RPC version",
            );
        }
        self.dispatch(request, principal).await
    }

    /// Route a decoded request to its handler.
    pub async fn dispatch(
        &self,
        request: JsonRpcRequest,
        principal: Option<&str>,
    ) -> JsonRpcResponse {
        debug!(method = %request.method, "dispatching request");
        match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(request.id),
            methods::INITIALIZED_NOTIFICATION => JsonRpcResponse::notification_handled(),
            methods::SHUTDOWN => JsonRpcResponse::success(request.id, json!({})),
            methods::TOOLS_LIST => self.handle_tools_list(request.id),
            methods::TOOLS_CALL => {
                self.handle_tools_call(request.id, request.params, principal)
                    .await
            }
            other => JsonRpcResponse::error(
                request.id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<JsonRpcId>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": "scratch-notebook",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<JsonRpcId>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "tools": get_tool_definitions() }))
    }

    async fn handle_tools_call(
        &self,
        id: Option<JsonRpcId>,
        params: Option<Value>,
        principal: Option<&str>,
    ) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                "Missing params for tools/call",
            );
        };
        let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                "Missing 'name' parameter in tools/call",
            );
        };
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        if !self.is_known_tool(tool_name) {
            return JsonRpcResponse::error(
                id,
                error_codes::TOOL_NOT_FOUND,
                format!("Unknown tool: {tool_name}"),
            );
        }

        let envelope = self.call_tool(tool_name, arguments, principal).await;
        let is_error = envelope.get("ok") == Some(&Value::Bool(false));
        JsonRpcResponse::success(
            id,
            json!({
                "content": [{
                    "type": "text",
                    "text": serde_json::to_string(&envelope).unwrap_or_else(|_| "{}".to_string())
                }],
                "isError": is_error
            }),
        )
    }

    fn is_known_tool(&self, name: &str) -> bool {
        use names::*;
        matches!(
            name,
            SCRATCH_CREATE
                | SCRATCH_READ
                | SCRATCH_LIST
                | SCRATCH_LIST_CELLS
                | SCRATCH_APPEND_CELL
                | SCRATCH_REPLACE_CELL
                | SCRATCH_DELETE
                | SCRATCH_VALIDATE
                | SCRATCH_SEARCH
                | SCRATCH_LIST_TAGS
                | SCRATCH_UPSERT_SCHEMA
                | SCRATCH_GET_SCHEMA
                | SCRATCH_LIST_SCHEMAS
                | SCRATCH_NAMESPACE_LIST
                | SCRATCH_NAMESPACE_CREATE
                | SCRATCH_NAMESPACE_RENAME
                | SCRATCH_NAMESPACE_DELETE
        )
    }

    /// Run a tool and return its `{ok, ...}` envelope. Used directly by the
    /// HTTP transport.
    pub async fn call_tool(&self, name: &str, args: Value, principal: Option<&str>) -> Value {
        let Some(_guard) = self.state.gate.try_enter() else {
            return self.failure(&ScratchError::config("Server is shutting down"));
        };

        let tenant = self.resolve_tenant(principal);
        let result = match name {
            names::SCRATCH_CREATE => self.scratch_create(&tenant, &args).await,
            names::SCRATCH_READ => self.scratch_read(&tenant, &args).await,
            names::SCRATCH_LIST => self.scratch_list(&tenant, &args).await,
            names::SCRATCH_LIST_CELLS => self.scratch_list_cells(&tenant, &args).await,
            names::SCRATCH_APPEND_CELL => self.scratch_append_cell(&tenant, &args).await,
            names::SCRATCH_REPLACE_CELL => self.scratch_replace_cell(&tenant, &args).await,
            names::SCRATCH_DELETE => self.scratch_delete(&tenant, &args).await,
            names::SCRATCH_VALIDATE => self.scratch_validate(&tenant, &args).await,
            names::SCRATCH_SEARCH => self.scratch_search(&tenant, &args).await,
            names::SCRATCH_LIST_TAGS => self.scratch_list_tags(&tenant, &args).await,
            names::SCRATCH_UPSERT_SCHEMA => self.scratch_upsert_schema(&tenant, &args).await,
            names::SCRATCH_GET_SCHEMA => self.scratch_get_schema(&tenant, &args).await,
            names::SCRATCH_LIST_SCHEMAS => self.scratch_list_schemas(&tenant, &args).await,
            names::SCRATCH_NAMESPACE_LIST => self.scratch_namespace_list(&tenant).await,
            names::SCRATCH_NAMESPACE_CREATE => self.scratch_namespace_create(&tenant, &args).await,
            names::SCRATCH_NAMESPACE_RENAME => self.scratch_namespace_rename(&tenant, &args).await,
            names::SCRATCH_NAMESPACE_DELETE => self.scratch_namespace_delete(&tenant, &args).await,
            other => Err(ScratchError::validation(format!("Unknown tool: {other}"))),
        };

        match result {
            Ok(payload) => success(payload),
            Err(err) => self.failure(&err),
        }
    }

    /// Resolve the request tenant: authenticated principal when available,
    /// otherwise the configured default.
    fn resolve_tenant(&self, principal: Option<&str>) -> String {
        match principal {
            Some(principal) => principal.to_string(),
            None => self.state.active_default_tenant(),
        }
    }

    fn failure(&self, err: &ScratchError) -> Value {
        self.state.metrics.record_error(err.code.as_str());
        json!({ "ok": false, "error": err.payload() })
    }

    // ------------------------------------------------------------------
    // Shared argument parsing and validation helpers
    // ------------------------------------------------------------------

    pub(crate) fn require_str(args: &Value, key: &str) -> ScratchResult<String> {
        args.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ScratchError::validation(format!("Missing required field: {key}")))
    }

    pub(crate) fn optional_bool(args: &Value, key: &str, default: bool) -> ScratchResult<bool> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(ScratchError::validation(format!("{key} must be a boolean"))),
        }
    }

    /// Parse an optional array of non-empty strings (namespace/tag/cell-id
    /// filters).
    pub(crate) fn string_filter(args: &Value, key: &str) -> ScratchResult<Option<Vec<String>>> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let Some(text) = item.as_str() else {
                        return Err(ScratchError::validation(format!(
                            "{key} filter must contain only strings"
                        )));
                    };
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        return Err(ScratchError::validation(format!(
                            "{key} filter values must not be empty"
                        )));
                    }
                    values.push(trimmed.to_string());
                }
                Ok(if values.is_empty() { None } else { Some(values) })
            }
            Some(_) => Err(ScratchError::validation(format!(
                "{key} filter must be an array of strings"
            ))),
        }
    }

    pub(crate) fn optional_limit(args: &Value, key: &str) -> ScratchResult<Option<usize>> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => match n.as_u64() {
                Some(value) => Ok(Some(value as usize)),
                None => Err(ScratchError::validation("Limit must not be negative")),
            },
            Some(_) => Err(ScratchError::validation("Limit must be an integer")),
        }
    }

    /// Build a cell from a tool payload. Top-level `tags` merges into
    /// `metadata.tags`; the cell id is server-assigned unless supplied.
    pub(crate) fn build_cell(payload: &Value, index: usize) -> ScratchResult<ScratchCell> {
        let Some(object) = payload.as_object() else {
            return Err(ScratchError::validation("Cell must be an object"));
        };

        // unrecognized languages are accepted and stored unvalidated
        let language = CellLanguage::from_name(&Self::require_str(payload, "language")?);
        let content = object
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| ScratchError::validation("Missing required field: content"))?
            .to_string();

        let cell_id = object
            .get("cell_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

        let mut metadata = match object.get("metadata") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(ScratchError::validation("Cell metadata must be an object")),
        };
        if let Some(tags) = object.get("tags") {
            let mut merged = scratch_notebook_core::types::tags_from_value(metadata.get("tags"));
            for tag in scratch_notebook_core::types::tags_from_value(Some(tags)) {
                if !merged.contains(&tag) {
                    merged.push(tag);
                }
            }
            if merged.is_empty() {
                metadata.remove("tags");
            } else {
                metadata.insert("tags".into(), Value::from(merged));
            }
        }

        Ok(ScratchCell {
            cell_id,
            index,
            language,
            content,
            validate: Self::optional_bool(payload, "validate", false)?,
            json_schema: object.get("json_schema").filter(|v| !v.is_null()).cloned(),
            metadata,
        })
    }

    /// Advisory validation under the request deadline. Diagnostics come back
    /// in the result list; only the deadline failing is an error.
    pub(crate) async fn validate_advisory(
        &self,
        cells: Vec<ScratchCell>,
        registry: &[SchemaEntry],
    ) -> ScratchResult<Vec<ValidationResult>> {
        if cells.is_empty() {
            return Ok(Vec::new());
        }
        let ctx = Arc::new(ValidationContext::from_registry(registry));
        let timeout = self.validation_timeout();
        validate_cells(cells, ctx, timeout).await
    }

    fn validation_timeout(&self) -> Option<Duration> {
        let timeout = self.state.config.validation_request_timeout;
        (!timeout.is_zero()).then_some(timeout)
    }

    /// `{"scratchpad": ...}` response payload. Mutations pass
    /// `include_content = false` so content never echoes back.
    pub(crate) fn pad_payload(pad: &Scratchpad, include_metadata: bool, include_content: bool) -> Value {
        json!({ "scratchpad": pad.to_response_value(include_metadata, include_content) })
    }

    pub(crate) fn record_operation(&self, operation: &str) {
        self.state.metrics.record_operation(operation);
    }
}

/// Wrap a success payload in the `{ok: true, ...}` envelope.
pub(crate) fn success(payload: Value) -> Value {
    let mut envelope = Map::new();
    envelope.insert("ok".into(), Value::Bool(true));
    if let Value::Object(map) = payload {
        envelope.extend(map);
    }
    Value::Object(envelope)
}
