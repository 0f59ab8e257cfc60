//! Core type definitions for the JSON-RPC wire format.
//!
//! # Type Categories
//!
//! - [`JsonRpcRequest`]: inbound envelope, decoded strictly (see [`validation`](crate::middleware::validation))
//! - [`JsonRpcResponse`], [`JsonRpcError`]: envelopes the proxy synthesizes itself
//! - [`UpstreamEnvelope`]: shape check applied to upstream bodies before they are passed through
//! - [`RequestId`]: the three id types JSON-RPC 2.0 allows
//! - [`CacheStatus`]: relay extension reported in the `x-cache-status` header
//!
//! Chain and endpoint types live in [`chain`](crate::chain).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{borrow::Cow, fmt};

/// JSON-RPC protocol version constant to avoid repeated allocations.
pub const JSONRPC_VERSION: &str = "2.0";

/// Pre-allocated `Cow` for JSON-RPC version.
pub const JSONRPC_VERSION_COW: Cow<'static, str> = Cow::Borrowed(JSONRPC_VERSION);

/// Deserializes a field that must distinguish "absent" from "present and null".
///
/// Paired with `#[serde(default)]`, an absent field stays `None` while an explicit `null`
/// becomes `Some(..)` of whatever the inner type makes of it.
pub(crate) fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A JSON-RPC request id: string, number, or null.
///
/// Objects, arrays and booleans are rejected at decode time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(serde_json::Number),
    String(String),
    Null,
}

impl RequestId {
    /// Extracts an id from an arbitrary JSON value, if it has an allowed type.
    ///
    /// Used to echo the caller's id on envelopes that failed strict decoding.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Null => Some(Self::Null),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::Null => Value::Null,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => f.write_str("null"),
        }
    }
}

/// Inbound JSON-RPC request envelope.
///
/// Field types are enforced by the decoder; the semantic checks (version tag, non-empty
/// method, id presence) happen in [`JsonRpcRequest::validate`].
///
/// # Example
///
/// ```
/// use relay_core::types::JsonRpcRequest;
///
/// let request: JsonRpcRequest =
///     serde_json::from_str(r#"{"jsonrpc":"2.0","method":"eth_blockNumber","id":1}"#).unwrap();
/// assert!(request.validate().is_ok());
/// assert!(request.params.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub id: Option<RequestId>,
}

impl JsonRpcRequest {
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Vec<Value>>, id: RequestId) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), method: method.into(), params, id: Some(id) }
    }

    /// Params as a slice, empty when absent.
    #[must_use]
    pub fn params_slice(&self) -> &[Value] {
        self.params.as_deref().unwrap_or_default()
    }

    /// The request id, or `Null` if none was supplied.
    #[must_use]
    pub fn id_or_null(&self) -> RequestId {
        self.id.clone().unwrap_or(RequestId::Null)
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-RPC response envelope synthesized by the proxy.
///
/// Upstream responses are normally passed through as raw bytes and never go through this
/// type; it is used for error envelopes and for cache hits whose id has to be rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: RequestId,
}

impl JsonRpcResponse {
    #[must_use]
    pub fn success(result: Value, id: RequestId) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, result: Some(result), error: None, id }
    }

    #[must_use]
    pub fn error(error: JsonRpcError, id: RequestId) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, result: None, error: Some(error), id }
    }
}

/// Shape of an upstream response body.
///
/// An upstream body is accepted only if it decodes into this type with a `2.0` version tag
/// and carries exactly one of `result` or `error`. `result: null` counts as present.
#[derive(Debug, Deserialize)]
pub struct UpstreamEnvelope {
    pub jsonrpc: String,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
    #[serde(default)]
    pub id: Value,
}

impl UpstreamEnvelope {
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.jsonrpc == JSONRPC_VERSION && (self.result.is_some() != self.error.is_some())
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// `true` when the upstream answered with `"result": null`.
    #[must_use]
    pub fn is_null_result(&self) -> bool {
        matches!(self.result, Some(Value::Null))
    }
}

/// How a response was served, reported via the `x-cache-status` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CacheStatus {
    /// Served from the response cache.
    Hit,
    /// Looked up, not found, served from an upstream.
    Miss,
    /// The cache was not consulted (disabled, error envelope, or non-cacheable path).
    Bypass,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheStatus::Hit => write!(f, "HIT"),
            CacheStatus::Miss => write!(f, "MISS"),
            CacheStatus::Bypass => write!(f, "BYPASS"),
        }
    }
}
