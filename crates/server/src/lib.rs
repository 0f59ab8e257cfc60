//! HTTP front end for the relay proxy.
//!
//! ```text
//!   request
//!     │
//!     ▼
//!   SetRequestId ─► PropagateRequestId ─► RequestBodyLimit ─► ConcurrencyLimit ─► Compression
//!     │
//!     ▼
//!   POST /          handle_rpc            (chain from ?chain=, body, or default)
//!   POST /{chain}   handle_rpc_for_chain  (chain from path)
//!   GET  /health    handle_health
//! ```

pub mod middleware;
pub mod router;

use axum::{
    routing::{get, post},
    Router,
};
use relay_core::config::ServerConfig;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer};

pub use router::AppState;

/// Builds the application router with its middleware stack.
pub fn create_app(state: AppState, config: &ServerConfig) -> Router {
    let (set_request_id, propagate_request_id) = middleware::create_request_id_layers();

    let rpc = Router::new()
        .route("/", post(router::handle_rpc))
        .route("/{chain}", post(router::handle_rpc_for_chain))
        .layer(CompressionLayer::new())
        .layer(ConcurrencyLimitLayer::new(config.max_concurrent_requests))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes));

    Router::new()
        .route("/health", get(router::handle_health))
        .merge(rpc)
        .with_state(state)
        // Layers are applied in reverse order, so propagate runs after set
        .layer(propagate_request_id)
        .layer(set_request_id)
}
