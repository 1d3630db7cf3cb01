//! Unified error type with stable codes.
//!
//! Every failure surfaced by a tool carries one of the codes below. Storage,
//! validation, and transport layers all construct `ScratchError` directly so
//! the request surface only has to serialize it. Error messages never include
//! filesystem paths or other infrastructure details.

use serde_json::Value;
use thiserror::Error;

/// Stable error codes shared across storage, tools, and transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotFound,
    InvalidId,
    InvalidIndex,
    CapacityLimitReached,
    ValidationError,
    ValidationTimeout,
    ConfigError,
    Unauthorized,
    Conflict,
    InternalError,
}

impl ErrorCode {
    /// Wire representation used in error payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidId => "INVALID_ID",
            ErrorCode::InvalidIndex => "INVALID_INDEX",
            ErrorCode::CapacityLimitReached => "CAPACITY_LIMIT_REACHED",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::ValidationTimeout => "VALIDATION_TIMEOUT",
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for the JSON transport.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::NotFound => 404,
            ErrorCode::InvalidId
            | ErrorCode::InvalidIndex
            | ErrorCode::ValidationError
            | ErrorCode::ConfigError => 400,
            ErrorCode::ValidationTimeout => 408,
            ErrorCode::CapacityLimitReached | ErrorCode::Conflict => 409,
            ErrorCode::Unauthorized => 401,
            ErrorCode::InternalError => 500,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain error carrying a stable code, a message, and optional structured
/// details.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ScratchError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<Value>,
}

impl ScratchError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidId, message)
    }

    pub fn invalid_index(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidIndex, message)
    }

    pub fn capacity(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CapacityLimitReached, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationTimeout, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Structured `{code, message, details?}` payload used in tool responses.
    pub fn payload(&self) -> Value {
        let mut payload = serde_json::json!({
            "code": self.code.as_str(),
            "message": self.message,
        });
        if let Some(details) = &self.details {
            payload["details"] = details.clone();
        }
        payload
    }
}

/// Convenient Result type for all core operations.
pub type ScratchResult<T> = Result<T, ScratchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_strings_are_stable() {
        assert_eq!(ErrorCode::NotFound.as_str(), "NOT_FOUND");
        assert_eq!(
            ErrorCode::CapacityLimitReached.as_str(),
            "CAPACITY_LIMIT_REACHED"
        );
        assert_eq!(ErrorCode::ValidationTimeout.as_str(), "VALIDATION_TIMEOUT");
    }

    #[test]
    fn http_mapping_matches_taxonomy() {
        assert_eq!(ErrorCode::NotFound.http_status(), 404);
        assert_eq!(ErrorCode::InvalidId.http_status(), 400);
        assert_eq!(ErrorCode::ValidationTimeout.http_status(), 408);
        assert_eq!(ErrorCode::CapacityLimitReached.http_status(), 409);
        assert_eq!(ErrorCode::Conflict.http_status(), 409);
        assert_eq!(ErrorCode::Unauthorized.http_status(), 401);
        assert_eq!(ErrorCode::InternalError.http_status(), 500);
    }

    #[test]
    fn payload_includes_optional_details() {
        let err = ScratchError::not_found("Scratchpad missing")
            .with_details(serde_json::json!({"scratch_id": "abc"}));
        let payload = err.payload();
        assert_eq!(payload["code"], "NOT_FOUND");
        assert_eq!(payload["message"], "Scratchpad missing");
        assert_eq!(payload["details"]["scratch_id"], "abc");
    }

    #[test]
    fn payload_omits_absent_details() {
        let payload = ScratchError::conflict("Namespace exists").payload();
        assert!(payload.get("details").is_none());
    }
}
