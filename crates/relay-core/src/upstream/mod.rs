//! Upstream endpoint selection and transport.
//!
//! - [`selector`]: weighted-random choice among a chain's active endpoints, biased by the
//!   rolling latency windows in [`latency_tracker`]
//! - [`http_client`]: the [`UpstreamTransport`] seam and its reqwest implementation
//! - [`errors`]: failure classification for a single upstream attempt
//!
//! ```text
//! ProxyEngine ──select()──▶ EndpointSelector ──reads──▶ LatencyWindow (per url)
//!      │                                                   ▲
//!      ├──send()──▶ UpstreamTransport (HttpClient)         │
//!      └──record_latency()─────────────────────────────────┘
//! ```

pub mod errors;
pub mod http_client;
pub mod latency_tracker;
pub mod selector;

pub use errors::UpstreamError;
pub use http_client::{HttpClient, HttpClientConfig, UpstreamTransport};
pub use latency_tracker::LatencyWindow;
pub use selector::{EndpointSelector, SelectorConfig};
