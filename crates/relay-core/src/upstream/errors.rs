use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling an upstream RPC endpoint.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UpstreamError {
    /// The call did not complete within the endpoint's timeout.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The endpoint could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The endpoint answered with a non-2xx status.
    ///
    /// First field is the HTTP status code, second is the (truncated) body.
    #[error("HTTP error {0}: {1}")]
    HttpError(u16, String),

    /// The endpoint answered 2xx with a body that is not a JSON-RPC 2.0 response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request could not be built. Retrying will not help.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

impl UpstreamError {
    /// Returns `true` if another attempt (possibly on another endpoint) may succeed.
    ///
    /// Every failure attributable to the endpoint or the network is retryable, including
    /// 4xx statuses: a provider rejecting a request with 401/403/404 says nothing about
    /// the next endpoint.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) |
            Self::ConnectionFailed(_) |
            Self::HttpError(_, _) |
            Self::InvalidResponse(_) => true,
            Self::InvalidRequest(_) | Self::ClientBuild(_) => false,
        }
    }

    /// Returns a static string representation for log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::ConnectionFailed(_) => "connection_failed",
            Self::HttpError(_, _) => "http_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::InvalidRequest(_) => "invalid_request",
            Self::ClientBuild(_) => "client_build",
        }
    }
}
