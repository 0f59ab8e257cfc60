//! Chain configuration seeded into the store and resolved per request.

use std::sync::Arc;

use relay_core::{
    chain::{seed_chains, ChainConfig, ChainConfigResolver, ChainHints, ChainId, Endpoint, StoreChainResolver},
    proxy::ProxyEngine,
    store::{keys, KvStore, MemoryStore, PutOptions},
    upstream::{EndpointSelector, HttpClient},
};
use serde_json::json;

use crate::mock_infrastructure::{fast_retry, parse_body, rpc_body, RpcMockBuilder};

fn store_engine(store: Arc<dyn KvStore>) -> ProxyEngine {
    let transport = HttpClient::new().expect("http client should build");
    ProxyEngine::new(
        Arc::new(StoreChainResolver::new(store)),
        Arc::new(EndpointSelector::new()),
        Arc::new(transport),
    )
    .with_retry_policy(fast_retry())
}

fn named_chain(name: &str, url: &str) -> ChainConfig {
    ChainConfig::new(ChainId::Named(name.into()), vec![Endpoint::new(url, 1).with_name(name)])
}

#[tokio::test]
async fn test_seeded_chain_resolved_by_path() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_method_result("getSlot", &json!(250_000_000u64), Some(1));

    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    seed_chains(store.as_ref(), &[named_chain("sol-main", &mock.url())]).await.expect("seed should succeed");

    let engine = store_engine(store);
    let response = engine.process(&rpc_body("getSlot", &json!([]), &json!(1)), &ChainHints::from_path("sol-main")).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.upstream.as_deref(), Some("sol-main"));
    assert_eq!(parse_body(&response)["result"], 250_000_000u64);
    mock.verify().await;
}

#[tokio::test]
async fn test_resolver_populates_chain_config_cache() {
    let store = Arc::new(MemoryStore::new());
    let chain = ChainConfig::new(10u64, vec![Endpoint::new("https://op.example.com", 1)]);
    seed_chains(store.as_ref(), std::slice::from_ref(&chain)).await.expect("seed should succeed");

    let cache_key = keys::chain_config_cache(&chain.chain_id);
    assert!(!store.contains_key(&cache_key));

    let resolver = StoreChainResolver::new(store.clone());
    let resolved = resolver.get_chain_config(&ChainId::Numeric(10)).await.expect("lookup should succeed");

    assert_eq!(resolved, Some(chain));
    assert!(store.contains_key(&cache_key));
    assert_eq!(resolver.get_chain_config(&ChainId::Numeric(11)).await.expect("lookup should succeed"), None);
}

#[tokio::test]
async fn test_reseeding_replaces_cached_config() {
    let mut old = RpcMockBuilder::new().await;
    old.mock_block_number(1, Some(1));
    let mut new = RpcMockBuilder::new().await;
    new.mock_block_number(2, Some(1));

    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let engine = store_engine(store.clone());
    let body = rpc_body("eth_blockNumber", &json!([]), &json!(1));

    seed_chains(store.as_ref(), &[ChainConfig::new(8453u64, vec![Endpoint::new(old.url(), 1)])])
        .await
        .expect("seed should succeed");
    let first = engine.process(&body, &ChainHints::from_path("8453")).await;
    assert_eq!(parse_body(&first)["result"], "0x1");

    seed_chains(store.as_ref(), &[ChainConfig::new(8453u64, vec![Endpoint::new(new.url(), 1)])])
        .await
        .expect("seed should succeed");
    let second = engine.process(&body, &ChainHints::from_path("0x2105")).await;
    assert_eq!(parse_body(&second)["result"], "0x2");

    old.verify().await;
    new.verify().await;
}

#[tokio::test]
async fn test_unconfigured_chain_not_supported() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let engine = store_engine(store);

    let response = engine
        .process(&rpc_body("eth_blockNumber", &json!([]), &json!(9)), &ChainHints::from_path("56"))
        .await;

    let parsed = parse_body(&response);
    assert_eq!(parsed["error"]["code"], -32001);
    assert_eq!(parsed["id"], 9);
}

#[tokio::test]
async fn test_corrupt_stored_config_is_internal_error() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    store
        .put(&keys::chain_config(&ChainId::Numeric(1)), "{not json".to_string(), PutOptions::default())
        .await
        .expect("put should succeed");

    let engine = store_engine(store);
    let response = engine
        .process(&rpc_body("eth_blockNumber", &json!([]), &json!(1)), &ChainHints::from_path("1"))
        .await;

    assert_eq!(response.status, 200);
    let parsed = parse_body(&response);
    assert_eq!(parsed["error"]["code"], -32603);
    assert_eq!(parsed["error"]["data"]["operational"], false);
}
