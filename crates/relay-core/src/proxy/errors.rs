use crate::{
    chain::{ChainId, ResolverError},
    middleware::validation::ValidationError,
    types::{JsonRpcError, JsonRpcResponse, RequestId},
    upstream::errors::UpstreamError,
};
use serde_json::json;

/// Terminal outcomes of the dispatcher, each rendered as a JSON-RPC error envelope.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Chain not supported: {0}")]
    ChainNotSupported(String),

    #[error("No healthy RPC available for chain {0}")]
    NoHealthyUpstream(ChainId),

    /// Retries exhausted. Carries the last underlying failure.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// JSON-RPC error code placed in the envelope.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Parse(_) => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::ChainNotSupported(_) => -32001,
            Self::NoHealthyUpstream(_) => -32002,
            Self::Network(_) => -32003,
            Self::Internal(_) => -32603,
        }
    }

    /// Transport status for a single (non-batch) response.
    ///
    /// Only undecodable input maps to a 4xx; everything else travels inside a 200.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Parse(_) | Self::InvalidRequest(_) => 400,
            _ => 200,
        }
    }

    /// `false` for failures that indicate a bug rather than an expected runtime condition.
    #[must_use]
    pub fn is_operational(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }

    /// Builds the error envelope echoing `id`.
    #[must_use]
    pub fn to_envelope(&self, id: RequestId) -> JsonRpcResponse {
        let data = (!self.is_operational()).then(|| json!({ "operational": false }));
        JsonRpcResponse::error(JsonRpcError { code: self.code(), message: self.to_string(), data }, id)
    }
}

impl From<ValidationError> for ProxyError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<UpstreamError> for ProxyError {
    fn from(err: UpstreamError) -> Self {
        if err.is_retryable() {
            Self::Network(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<ResolverError> for ProxyError {
    fn from(err: ResolverError) -> Self {
        Self::Internal(err.to_string())
    }
}
