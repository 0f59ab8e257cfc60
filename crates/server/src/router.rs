use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use relay_core::{
    chain::{ChainHints, ChainId},
    proxy::{ProxyEngine, ProxyError, ProxyResponse},
    types::RequestId,
};
use serde::Deserialize;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn, Instrument};

use crate::middleware::CorrelationId;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProxyEngine>,
    /// Chains configured at startup. `/health` resolves their current state.
    pub chains: Arc<[ChainId]>,
    /// Outer deadline for one inbound request.
    pub request_timeout: Duration,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChainQuery {
    pub chain: Option<String>,
}

/// `POST /`: chain from `?chain=`, the body, or the configured default.
pub async fn handle_rpc(
    State(state): State<AppState>,
    Query(query): Query<ChainQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let hints = ChainHints { path: None, query: query.chain };
    dispatch(&state, &headers, &body, &hints).await
}

/// `POST /{chain}`: chain from the path segment.
pub async fn handle_rpc_for_chain(
    State(state): State<AppState>,
    Path(chain): Path<String>,
    Query(query): Query<ChainQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let hints = ChainHints { path: Some(chain), query: query.chain };
    dispatch(&state, &headers, &body, &hints).await
}

async fn dispatch(state: &AppState, headers: &HeaderMap, body: &[u8], hints: &ChainHints) -> Response {
    let correlation_id = CorrelationId::from_headers(headers);
    let span = tracing::info_span!("rpc", request_id = %correlation_id);

    // dropping the engine future on expiry cancels any in-flight upstream call
    let outcome = tokio::time::timeout(state.request_timeout, state.engine.process(body, hints))
        .instrument(span.clone())
        .await;

    let response = match outcome {
        Ok(response) => response,
        Err(_) => {
            span.in_scope(|| {
                warn!(timeout_secs = state.request_timeout.as_secs(), "request deadline exceeded");
            });
            let error = ProxyError::Network(format!(
                "request timed out after {}s",
                state.request_timeout.as_secs()
            ));
            ProxyResponse::from_error(&error, request_id_of(body))
        }
    };

    span.in_scope(|| {
        debug!(status = response.status, cache_status = %response.cache_status, "request completed");
    });
    into_http_response(response)
}

/// The id of a single request body; null for batches and unparseable bodies.
fn request_id_of(body: &[u8]) -> RequestId {
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => RequestId::from_value(&value["id"]).unwrap_or(RequestId::Null),
        _ => RequestId::Null,
    }
}

fn into_http_response(response: ProxyResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    let mut http = (status, response.body).into_response();

    let headers = http.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(value) = HeaderValue::from_str(&response.cache_status.to_string()) {
        headers.insert("x-cache-status", value);
    }
    if let Some(value) = response.upstream.as_deref().and_then(|u| HeaderValue::from_str(u).ok()) {
        headers.insert("x-upstream", value);
    }
    http
}

/// `GET /health`: configured chains and their active endpoint counts.
///
/// Chain state is read through the resolver, so endpoints toggled in the store after
/// startup are reflected. Reports `503` when no configured chain has an active endpoint.
pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let resolver = state.engine.resolver();
    let mut chains = Vec::with_capacity(state.chains.len());
    let mut serving = false;

    for chain_id in state.chains.iter() {
        let entry = match resolver.get_chain_config(chain_id).await {
            Ok(Some(chain)) => {
                let active = chain.active_count();
                serving |= active > 0;
                serde_json::json!({
                    "chain_id": chain.chain_id,
                    "name": chain.name,
                    "endpoints": chain.endpoints.len(),
                    "active_endpoints": active,
                })
            }
            Ok(None) => serde_json::json!({
                "chain_id": chain_id,
                "endpoints": 0,
                "active_endpoints": 0,
                "error": "not configured",
            }),
            Err(e) => {
                warn!(chain = %chain_id, error = %e, "health check could not resolve chain");
                serde_json::json!({
                    "chain_id": chain_id,
                    "endpoints": 0,
                    "active_endpoints": 0,
                    "error": e.to_string(),
                })
            }
        };
        chains.push(entry);
    }

    let cache = state.engine.cache().map(|cache| {
        let stats = cache.stats();
        serde_json::json!({
            "hits": stats.hits,
            "misses": stats.misses,
            "writes": stats.writes,
            "expired": stats.expired,
            "degraded": stats.degraded,
        })
    });

    let health_status = serde_json::json!({
        "status": if serving { "healthy" } else { "unhealthy" },
        "chains": chains,
        "cache": cache,
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    (
        if serving { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE },
        [("content-type", "application/json")],
        serde_json::to_string(&health_status).unwrap_or_default(),
    )
}
