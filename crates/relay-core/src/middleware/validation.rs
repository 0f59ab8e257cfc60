use crate::types::{JsonRpcRequest, RequestId, JSONRPC_VERSION};
use serde_json::Value;

impl JsonRpcRequest {
    /// Validates a decoded JSON-RPC request.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the request fails validation checks:
    /// - [`ValidationError::InvalidVersion`] if not JSON-RPC 2.0
    /// - [`ValidationError::EmptyMethod`] if the method name is empty
    /// - [`ValidationError::InvalidMethod`] if method contains invalid characters
    /// - [`ValidationError::MissingId`] if the `id` member is absent
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Err(ValidationError::InvalidVersion(self.jsonrpc.clone()));
        }

        if self.method.is_empty() {
            return Err(ValidationError::EmptyMethod);
        }

        if !self.method.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
            return Err(ValidationError::InvalidMethod(self.method.clone()));
        }

        if self.id.is_none() {
            return Err(ValidationError::MissingId);
        }

        Ok(())
    }
}

/// A request that failed decoding or validation, with the id to echo back.
#[derive(Debug)]
pub struct RejectedRequest {
    pub error: ValidationError,
    pub id: RequestId,
}

/// Strictly decodes and validates one request envelope.
///
/// Any shape mismatch fails closed. The caller's id is recovered from the raw value
/// whenever it has an allowed type, so the rejection can echo it.
///
/// # Errors
///
/// Returns a [`RejectedRequest`] describing the first problem found.
pub fn decode_request(value: Value) -> Result<JsonRpcRequest, RejectedRequest> {
    let Some(object) = value.as_object() else {
        return Err(RejectedRequest { error: ValidationError::NotAnObject, id: RequestId::Null });
    };
    let fallback_id = object.get("id").and_then(RequestId::from_value).unwrap_or(RequestId::Null);

    let request: JsonRpcRequest = serde_json::from_value(value).map_err(|e| RejectedRequest {
        error: ValidationError::Malformed(e.to_string()),
        id: fallback_id.clone(),
    })?;

    request.validate().map_err(|error| RejectedRequest { error, id: fallback_id })?;
    Ok(request)
}

/// Validation errors for JSON-RPC requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("request must be a JSON object")]
    NotAnObject,

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("invalid JSON-RPC version: {0}")]
    InvalidVersion(String),

    #[error("method must be a non-empty string")]
    EmptyMethod,

    #[error("invalid method name: {0}")]
    InvalidMethod(String),

    #[error("missing request id")]
    MissingId,
}
