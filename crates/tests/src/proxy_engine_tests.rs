//! End-to-end engine behavior over a real HTTP transport.

use relay_core::{chain::ChainHints, types::CacheStatus};
use serde_json::json;

use crate::mock_infrastructure::{cached_engine_for, engine_for, parse_body, rpc_body, single_chain, RpcMockBuilder};

#[tokio::test]
async fn test_forwards_to_upstream_and_returns_its_body() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_block_number(0x1234, Some(1));

    let engine = engine_for(vec![single_chain(1, &mock.url())]);
    let response = engine.process(&rpc_body("eth_blockNumber", &json!([]), &json!(1)), &ChainHints::default()).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.cache_status, CacheStatus::Bypass);
    assert_eq!(response.upstream.as_deref(), Some("primary"));
    assert_eq!(parse_body(&response)["result"], "0x1234");
    mock.verify().await;
}

#[tokio::test]
async fn test_invalid_request_never_reaches_upstream() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_failure(500, 0);

    let engine = engine_for(vec![single_chain(1, &mock.url())]);
    let body = json!({ "jsonrpc": "1.0", "method": "eth_blockNumber", "id": 7 }).to_string();
    let response = engine.process(body.as_bytes(), &ChainHints::default()).await;

    assert_eq!(response.status, 400);
    let parsed = parse_body(&response);
    assert_eq!(parsed["error"]["code"], -32600);
    assert_eq!(parsed["id"], 7);
    mock.verify().await;
}

#[tokio::test]
async fn test_unparseable_body_is_a_parse_error() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_failure(500, 0);

    let engine = engine_for(vec![single_chain(1, &mock.url())]);
    let response = engine.process(b"{\"jsonrpc\":", &ChainHints::default()).await;

    assert_eq!(response.status, 400);
    let parsed = parse_body(&response);
    assert_eq!(parsed["error"]["code"], -32700);
    assert!(parsed["id"].is_null());
    mock.verify().await;
}

#[tokio::test]
async fn test_cached_response_served_without_second_upstream_call() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_method_result("eth_getBalance", &json!("0xde0b6b3a7640000"), Some(1));

    let engine = cached_engine_for(vec![single_chain(1, &mock.url())]);
    let params = json!(["0x00000000000000000000000000000000000000aa", "latest"]);

    let first = engine.process(&rpc_body("eth_getBalance", &params, &json!(1)), &ChainHints::default()).await;
    assert_eq!(first.cache_status, CacheStatus::Miss);

    let second = engine.process(&rpc_body("eth_getBalance", &params, &json!("abc")), &ChainHints::default()).await;
    assert_eq!(second.cache_status, CacheStatus::Hit);
    assert!(second.upstream.is_none());

    let parsed = parse_body(&second);
    assert_eq!(parsed["result"], "0xde0b6b3a7640000");
    assert_eq!(parsed["id"], "abc");

    mock.verify().await;
}

#[tokio::test]
async fn test_cache_is_scoped_per_chain() {
    let mut mainnet = RpcMockBuilder::new().await;
    mainnet.mock_method_result("eth_gasPrice", &json!("0x1"), Some(1));
    let mut polygon = RpcMockBuilder::new().await;
    polygon.mock_method_result("eth_gasPrice", &json!("0x2"), Some(1));

    let engine = cached_engine_for(vec![single_chain(1, &mainnet.url()), single_chain(137, &polygon.url())]);
    let body = rpc_body("eth_gasPrice", &json!([]), &json!(1));

    let on_mainnet = engine.process(&body, &ChainHints::from_path("1")).await;
    let on_polygon = engine.process(&body, &ChainHints::from_path("137")).await;

    assert_eq!(parse_body(&on_mainnet)["result"], "0x1");
    assert_eq!(parse_body(&on_polygon)["result"], "0x2");
    assert_eq!(on_polygon.cache_status, CacheStatus::Miss);

    mainnet.verify().await;
    polygon.verify().await;
}

#[tokio::test]
async fn test_non_whitelisted_method_is_not_cached() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_method_result("eth_sendRawTransaction", &json!("0xabc"), Some(2));

    let engine = cached_engine_for(vec![single_chain(1, &mock.url())]);
    let body = rpc_body("eth_sendRawTransaction", &json!(["0x02f8"]), &json!(1));

    for _ in 0..2 {
        let response = engine.process(&body, &ChainHints::default()).await;
        assert_eq!(response.cache_status, CacheStatus::Bypass);
    }

    mock.verify().await;
}

#[tokio::test]
async fn test_upstream_error_envelope_passed_through_and_not_cached() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_rpc_error("eth_call", 3, "execution reverted");

    let engine = cached_engine_for(vec![single_chain(1, &mock.url())]);
    let body = rpc_body("eth_call", &json!([{ "to": "0x01" }, "latest"]), &json!(1));

    let first = engine.process(&body, &ChainHints::default()).await;
    assert_eq!(first.status, 200);
    let parsed = parse_body(&first);
    assert_eq!(parsed["error"]["code"], 3);
    assert_eq!(parsed["error"]["message"], "execution reverted");

    let second = engine.process(&body, &ChainHints::default()).await;
    assert_eq!(second.cache_status, CacheStatus::Miss);
    assert_eq!(engine.cache().map(|c| c.stats().writes), Some(0));
}

#[tokio::test]
async fn test_batch_preserves_order_and_isolates_failures() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_block_number(10, None);
    mock.mock_method_result("eth_chainId", &json!("0x1"), None);

    let engine = engine_for(vec![single_chain(1, &mock.url())]);
    let body = json!([
        { "jsonrpc": "2.0", "method": "eth_blockNumber", "params": [], "id": 1 },
        { "jsonrpc": "2.0", "method": "", "id": 2 },
        { "jsonrpc": "2.0", "method": "eth_chainId", "params": [], "id": 3 }
    ])
    .to_string();

    let response = engine.process(body.as_bytes(), &ChainHints::default()).await;
    assert_eq!(response.status, 200);
    assert!(response.upstream.is_none());

    let parsed = parse_body(&response);
    let items = parsed.as_array().expect("batch response should be an array");
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["result"], "0xa");
    assert_eq!(items[1]["error"]["code"], -32600);
    assert_eq!(items[1]["id"], 2);
    assert_eq!(items[2]["result"], "0x1");
}

#[tokio::test]
async fn test_unknown_chain_is_reported_without_upstream_call() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_failure(500, 0);

    let engine = engine_for(vec![single_chain(1, &mock.url())]);
    let response = engine
        .process(&rpc_body("eth_blockNumber", &json!([]), &json!(5)), &ChainHints::from_query("424242"))
        .await;

    assert_eq!(response.status, 200);
    let parsed = parse_body(&response);
    assert_eq!(parsed["error"]["code"], -32001);
    assert_eq!(parsed["id"], 5);
    mock.verify().await;
}

#[tokio::test]
async fn test_chain_taken_from_params_object() {
    let mut polygon = RpcMockBuilder::new().await;
    polygon.mock_method_result("eth_getCode", &json!("0x6080"), Some(1));
    let mut mainnet = RpcMockBuilder::new().await;
    mainnet.mock_failure(500, 0);

    let engine = engine_for(vec![single_chain(1, &mainnet.url()), single_chain(137, &polygon.url())]);
    let body = rpc_body("eth_getCode", &json!(["0x01", "latest", { "chainId": "0x89" }]), &json!(1));

    let response = engine.process(&body, &ChainHints::default()).await;
    assert_eq!(parse_body(&response)["result"], "0x6080");

    polygon.verify().await;
    mainnet.verify().await;
}
