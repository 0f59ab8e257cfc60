//! Engine builders and body helpers shared by the integration tests.

use std::{collections::HashMap, sync::Arc, time::Duration};

use relay_core::{
    cache::{CachePolicy, ResponseCache},
    chain::{ChainConfig, Endpoint, StaticChainResolver},
    proxy::{ProxyEngine, ProxyResponse, RetryPolicy},
    store::{KvStore, MemoryStore},
    upstream::{EndpointSelector, HttpClient},
};
use serde_json::{json, Value};

/// Builds a serialized single JSON-RPC request.
#[must_use]
pub fn rpc_body(method: &str, params: &Value, id: &Value) -> Vec<u8> {
    json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": id })
        .to_string()
        .into_bytes()
}

/// Parses a proxy response body as JSON.
///
/// # Panics
///
/// Panics if the body is not valid JSON.
#[must_use]
pub fn parse_body(response: &ProxyResponse) -> Value {
    serde_json::from_slice(&response.body).expect("proxy response body should be JSON")
}

/// A chain with a single endpoint at `url`.
#[must_use]
pub fn single_chain(chain_id: u64, url: &str) -> ChainConfig {
    ChainConfig::new(chain_id, vec![Endpoint::new(url, 1).with_name("primary")])
}

/// Retry policy with short delays so failover tests stay fast.
#[must_use]
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new().with_base_delay_ms(10).with_max_delay_ms(100)
}

/// An engine over a real HTTP transport, defaulting to chain 1, without a cache.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn engine_for(chains: Vec<ChainConfig>) -> ProxyEngine {
    let transport = HttpClient::new().expect("http client should build");
    ProxyEngine::new(
        Arc::new(StaticChainResolver::new(chains)),
        Arc::new(EndpointSelector::new()),
        Arc::new(transport),
    )
    .with_retry_policy(fast_retry())
    .with_default_chain(Some(1.into()))
}

/// Same as [`engine_for`], with a response cache over a fresh in-memory store.
#[must_use]
pub fn cached_engine_for(chains: Vec<ChainConfig>) -> ProxyEngine {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let policy = CachePolicy::new(Duration::from_secs(60), &HashMap::new());
    engine_for(chains).with_cache(Arc::new(ResponseCache::new(store)), policy)
}
