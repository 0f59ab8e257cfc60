//! Chain id extraction from an inbound request.
//!
//! Precedence, first match wins:
//!
//! 1. URL path segment (`POST /137`, `POST /sol-main`)
//! 2. `chain` query parameter (`POST /?chain=137`)
//! 3. `chainId` / `chain_id` / `chain` field of the first object-typed param
//! 4. The configured default chain

use super::ChainId;
use serde_json::Value;
use thiserror::Error;

/// Body fields consulted, in order, on the first object-typed param.
const BODY_FIELDS: &[&str] = &["chainId", "chain_id", "chain"];

/// Chain hints carried by the transport, outside the JSON-RPC body.
#[derive(Debug, Clone, Default)]
pub struct ChainHints {
    pub path: Option<String>,
    pub query: Option<String>,
}

impl ChainHints {
    #[must_use]
    pub fn from_path(path: impl Into<String>) -> Self {
        Self { path: Some(path.into()), query: None }
    }

    #[must_use]
    pub fn from_query(query: impl Into<String>) -> Self {
        Self { path: None, query: Some(query.into()) }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no chain id in path, query, params, or configuration")]
    Missing,
}

/// Resolves the target chain for one request.
///
/// # Errors
///
/// Returns [`ResolveError::Missing`] when no source yields a usable id.
pub fn resolve_chain_id(
    hints: &ChainHints,
    params: &[Value],
    default: Option<&ChainId>,
) -> Result<ChainId, ResolveError> {
    hints
        .path
        .as_deref()
        .and_then(ChainId::parse)
        .or_else(|| hints.query.as_deref().and_then(ChainId::parse))
        .or_else(|| from_params(params))
        .or_else(|| default.cloned())
        .ok_or(ResolveError::Missing)
}

fn from_params(params: &[Value]) -> Option<ChainId> {
    let object = params.iter().find_map(Value::as_object)?;
    BODY_FIELDS.iter().find_map(|field| match object.get(*field)? {
        Value::Number(n) => n.as_u64().map(ChainId::Numeric),
        Value::String(s) => ChainId::parse(s),
        _ => None,
    })
}
