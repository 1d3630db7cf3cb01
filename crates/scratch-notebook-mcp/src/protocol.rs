//! JSON-RPC 2.0 envelope for the MCP wire protocol.
//!
//! Every transport funnels raw frames through these types: stdio and the
//! SSE message endpoint decode a `JsonRpcRequest`, the dispatcher answers
//! with a `JsonRpcResponse`. Notifications get the empty marker response so
//! transports know there is nothing to write back.

use serde::{Deserialize, Serialize};

/// Methods the dispatcher routes. Everything else is `METHOD_NOT_FOUND`.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED_NOTIFICATION: &str = "notifications/initialized";
    pub const SHUTDOWN: &str = "shutdown";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
}

/// JSON-RPC error codes.
///
/// Only protocol-level failures use these; a tool that fails for domain
/// reasons still returns a JSON-RPC success whose payload carries the
/// `{ok: false, error}` envelope.
pub mod error_codes {
    // reserved range from the JSON-RPC 2.0 specification
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    /// `tools/call` named a tool the registry does not know.
    pub const TOOL_NOT_FOUND: i32 = -32001;
}

/// Request id. The protocol allows strings and numbers, and an explicit
/// `"id": null` is still a request id; only an *absent* id marks a
/// notification, so the null form needs its own variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcId {
    String(String),
    Number(i64),
    Null,
}

/// Decoded request frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<JsonRpcId>,
    pub method: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

/// Error object on a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Response frame. A real response carries exactly one of `result` or
/// `error`; the marker built by [`JsonRpcResponse::notification_handled`]
/// carries neither and is filtered out before serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonRpcId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<JsonRpcId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<JsonRpcId>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Marker for a handled notification; nothing goes on the wire.
    pub fn notification_handled() -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            result: None,
            error: None,
        }
    }

    /// True for the marker produced by [`Self::notification_handled`].
    pub fn is_empty_notification(&self) -> bool {
        self.id.is_none() && self.result.is_none() && self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_forms_all_decode() {
        let with_number: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#).unwrap();
        assert_eq!(with_number.id, Some(JsonRpcId::Number(3)));

        let with_string: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"a1","method":"tools/list"}"#).unwrap();
        assert_eq!(with_string.id, Some(JsonRpcId::String("a1".into())));

        // "id": null is a request; a missing id is a notification
        let with_null: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":null,"method":"shutdown"}"#).unwrap();
        assert_eq!(with_null.id, Some(JsonRpcId::Null));

        let notification: JsonRpcRequest = serde_json::from_str(
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        )
        .unwrap();
        assert!(notification.id.is_none());
    }

    #[test]
    fn missing_params_default_to_none() {
        let request: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#).unwrap();
        assert!(request.params.is_none());
    }

    #[test]
    fn serialized_responses_carry_exactly_one_arm() {
        let ok = JsonRpcResponse::success(Some(JsonRpcId::Number(1)), json!({"tools": []}));
        let encoded = serde_json::to_value(&ok).unwrap();
        assert!(encoded.get("result").is_some());
        assert!(encoded.get("error").is_none());

        let failed = JsonRpcResponse::error(
            Some(JsonRpcId::String("a1".into())),
            error_codes::TOOL_NOT_FOUND,
            "Unknown tool: scratch_bogus",
        );
        let encoded = serde_json::to_value(&failed).unwrap();
        assert!(encoded.get("result").is_none());
        assert_eq!(encoded["error"]["code"], error_codes::TOOL_NOT_FOUND);
        assert_eq!(encoded["error"]["message"], "Unknown tool: scratch_bogus");
        assert!(encoded["error"].get("data").is_none());
    }

    #[test]
    fn notification_marker_never_reaches_the_wire() {
        let marker = JsonRpcResponse::notification_handled();
        assert!(marker.is_empty_notification());
        // a handled request with an empty result is not the marker
        let real = JsonRpcResponse::success(None, json!({}));
        assert!(!real.is_empty_notification());
    }
}
