//! Request correlation ids.
//!
//! Every inbound request carries an `x-request-id`: the caller's if it sent one, otherwise a
//! fresh UUID v4. The same value is echoed on the response and attached to the request's
//! tracing span, so a reply can be matched to its log lines.

use axum::http::{header::HeaderValue, HeaderMap, HeaderName, Request};
use std::sync::Arc;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// The header name for request correlation IDs.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// The id a request is logged under.
#[derive(Clone, Debug)]
pub struct CorrelationId(pub Arc<str>);

impl CorrelationId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(Arc::from(Uuid::new_v4().to_string()))
    }

    /// Reads the id set by the request-id layer, generating one if the header is missing
    /// or not valid UTF-8.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map_or_else(Self::generate, Self::new)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UUID v4 generator for tower-http's request id layer.
#[derive(Clone, Copy, Default)]
pub struct UuidRequestIdGenerator;

impl MakeRequestId for UuidRequestIdGenerator {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        Some(RequestId::new(HeaderValue::from_str(&id).ok()?))
    }
}

/// Returns `(set, propagate)`. Apply `propagate` first so that `set` wraps it and runs
/// before it on the way in.
pub fn create_request_id_layers() -> (
    tower_http::request_id::SetRequestIdLayer<UuidRequestIdGenerator>,
    tower_http::request_id::PropagateRequestIdLayer,
) {
    use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

    let set_layer = SetRequestIdLayer::new(X_REQUEST_ID.clone(), UuidRequestIdGenerator);
    let propagate_layer = PropagateRequestIdLayer::new(X_REQUEST_ID.clone());

    (set_layer, propagate_layer)
}
