//! Retry bounds and failover between upstream endpoints.

use std::time::Instant;

use relay_core::chain::{ChainConfig, ChainHints, Endpoint};
use serde_json::json;

use crate::mock_infrastructure::{engine_for, parse_body, rpc_body, single_chain, RpcMockBuilder};

fn block_number() -> Vec<u8> {
    rpc_body("eth_blockNumber", &json!([]), &json!(1))
}

#[tokio::test]
async fn test_retry_bound_on_persistent_failure() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_failure(503, 4);

    let engine = engine_for(vec![single_chain(1, &mock.url())]);
    let started = Instant::now();
    let response = engine.process(&block_number(), &ChainHints::default()).await;
    let elapsed = started.elapsed();

    assert_eq!(response.status, 200);
    let parsed = parse_body(&response);
    assert_eq!(parsed["error"]["code"], -32003);
    assert_eq!(parsed["id"], 1);

    // 10 + 20 + 40 ms of backoff between the four attempts
    assert!(elapsed.as_millis() >= 70, "backoff too short: {elapsed:?}");
    mock.verify().await;
}

#[tokio::test]
async fn test_malformed_upstream_body_is_retried() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_malformed(4);

    let engine = engine_for(vec![single_chain(1, &mock.url())]);
    let response = engine.process(&block_number(), &ChainHints::default()).await;

    assert_eq!(parse_body(&response)["error"]["code"], -32003);
    mock.verify().await;
}

#[tokio::test]
async fn test_failover_skips_failed_endpoint_when_exclusion_enabled() {
    let mut broken = RpcMockBuilder::new().await;
    broken.mock_failure_at_most(502, 5);
    let mut healthy = RpcMockBuilder::new().await;
    healthy.mock_block_number(77, Some(5));

    let chain = ChainConfig::new(
        1u64,
        vec![
            Endpoint::new(broken.url(), 1).with_name("broken"),
            Endpoint::new(healthy.url(), 1).with_name("healthy"),
        ],
    );
    let engine = engine_for(vec![chain]).with_failover_exclusion(true);

    for _ in 0..5 {
        let response = engine.process(&block_number(), &ChainHints::default()).await;
        assert_eq!(parse_body(&response)["result"], "0x4d");
        assert_eq!(response.upstream.as_deref(), Some("healthy"));
    }

    // at most one failed attempt per request
    broken.verify().await;
    healthy.verify().await;
}

#[tokio::test]
async fn test_endpoint_retry_cap_excludes_endpoint() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_failure(500, 2);

    let chain = ChainConfig::new(1u64, vec![Endpoint::new(mock.url(), 1).with_max_retries(1)]);
    let engine = engine_for(vec![chain]);
    let response = engine.process(&block_number(), &ChainHints::default()).await;

    assert_eq!(parse_body(&response)["error"]["code"], -32003);
    mock.verify().await;
}

#[tokio::test]
async fn test_only_inactive_endpoints_reports_no_healthy_upstream() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_failure(500, 0);

    let chain = ChainConfig::new(1u64, vec![Endpoint::new(mock.url(), 1).inactive()]);
    let engine = engine_for(vec![chain]);
    let response = engine.process(&block_number(), &ChainHints::default()).await;

    assert_eq!(response.status, 200);
    assert_eq!(parse_body(&response)["error"]["code"], -32002);
    mock.verify().await;
}

#[tokio::test]
async fn test_bearer_credential_sent_to_upstream() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_with_bearer("s3cret", "eth_chainId", &json!("0x1"));

    let chain = ChainConfig::new(1u64, vec![Endpoint::new(mock.url(), 1).with_auth("s3cret")]);
    let engine = engine_for(vec![chain]);
    let response = engine.process(&rpc_body("eth_chainId", &json!([]), &json!(1)), &ChainHints::default()).await;

    assert_eq!(parse_body(&response)["result"], "0x1");
    mock.verify().await;
}

#[tokio::test]
async fn test_successful_attempt_records_latency() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_block_number(1, Some(3));

    let url = mock.url();
    let engine = engine_for(vec![single_chain(1, &url)]);
    assert_eq!(engine.selector().sample_count(&url), 0);

    for _ in 0..3 {
        engine.process(&block_number(), &ChainHints::default()).await;
    }

    assert_eq!(engine.selector().sample_count(&url), 3);
    assert!(engine.selector().average_latency(&url).is_some());
    mock.verify().await;
}

#[tokio::test]
async fn test_failed_attempts_do_not_record_latency() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_failure(500, 4);

    let url = mock.url();
    let engine = engine_for(vec![single_chain(1, &url)]);
    engine.process(&block_number(), &ChainHints::default()).await;

    assert_eq!(engine.selector().sample_count(&url), 0);
    mock.verify().await;
}
