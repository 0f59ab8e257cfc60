//! HTTP middleware components for the RPC server.
//!
//! Request validation lives in `relay_core::middleware`; this module only carries the
//! HTTP-level concerns that have no meaning inside the core.

pub mod correlation_id;

pub use correlation_id::{create_request_id_layers, CorrelationId, UuidRequestIdGenerator, X_REQUEST_ID};
