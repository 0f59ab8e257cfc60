//! RPC mock builder for upstream JSON-RPC endpoints.
//!
//! Wraps mockito. Each builder owns one server, i.e. one upstream endpoint. Keep the
//! mocks registered on one builder disjoint (different methods) so matching is unambiguous.

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

fn method_matcher(method: &str) -> Matcher {
    Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#))
}

/// Builder for creating mock upstream responses.
pub struct RpcMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl RpcMockBuilder {
    /// Creates a new RPC mock builder with a fresh mockito server.
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    /// Returns the URL of the mock server.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Mocks `eth_blockNumber`, optionally expecting exactly `hits` calls.
    pub fn mock_block_number(&mut self, block_number: u64, hits: Option<usize>) -> &mut Self {
        self.mock_method_result("eth_blockNumber", &json!(format!("0x{block_number:x}")), hits)
    }

    /// Mocks `method` answering with `result`, optionally expecting exactly `hits` calls.
    pub fn mock_method_result(&mut self, method: &str, result: &Value, hits: Option<usize>) -> &mut Self {
        let mut mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher(method))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string());
        if let Some(hits) = hits {
            mock = mock.expect(hits);
        }

        self.mocks.push(mock.create());
        self
    }

    /// Mocks `method` answering with a JSON-RPC error object.
    pub fn mock_rpc_error(&mut self, method: &str, code: i64, message: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher(method))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({ "jsonrpc": "2.0", "id": 1, "error": { "code": code, "message": message } })
                    .to_string(),
            )
            .create();

        self.mocks.push(mock);
        self
    }

    /// Answers every request with `status`, expecting exactly `hits` calls.
    pub fn mock_failure(&mut self, status: usize, hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(status)
            .with_body("upstream unavailable")
            .expect(hits)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Answers every request with `status`, tolerating up to `max_hits` calls.
    pub fn mock_failure_at_most(&mut self, status: usize, max_hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(status)
            .expect_at_most(max_hits)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Answers every request with 200 and a body that is not a JSON-RPC response.
    pub fn mock_malformed(&mut self, hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html>maintenance</html>")
            .expect(hits)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks `method` behind bearer authentication. Requests without the token fall
    /// through to mockito's default 501.
    pub fn mock_with_bearer(&mut self, token: &str, method: &str, result: &Value) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_header("authorization", format!("Bearer {token}").as_str())
            .match_body(method_matcher(method))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
            .expect(1)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Asserts every mock was hit as expected. Mocks registered without an explicit count
    /// expect exactly one call.
    pub async fn verify(&self) {
        for mock in &self.mocks {
            mock.assert_async().await;
        }
    }
}
