use std::{collections::HashMap, sync::Arc};

use bytes::{BufMut, Bytes, BytesMut};
use futures::future::join_all;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{
    cache::{CachePolicy, ResponseCache},
    chain::{resolve_chain_id, ChainConfig, ChainConfigResolver, ChainHints, ChainId, Endpoint},
    middleware::validation::decode_request,
    types::{CacheStatus, JsonRpcRequest, JsonRpcResponse, RequestId, UpstreamEnvelope},
    upstream::{EndpointSelector, UpstreamError, UpstreamTransport},
    utils::cache_key::derive_cache_key,
};

use super::{
    errors::ProxyError,
    retry::{AttemptOutcome, RetryPolicy},
};

/// Fully rendered reply for one inbound HTTP body.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: Bytes,
    pub cache_status: CacheStatus,
    /// Display name of the endpoint that served the response; `None` for hits and errors.
    pub upstream: Option<String>,
}

impl ProxyResponse {
    /// Renders a terminal error as a complete reply.
    #[must_use]
    pub fn from_error(error: &ProxyError, id: RequestId) -> Self {
        Self {
            status: error.http_status(),
            body: render(&error.to_envelope(id)),
            cache_status: CacheStatus::Bypass,
            upstream: None,
        }
    }
}

/// A successfully served single request.
struct Served {
    body: Bytes,
    cache_status: CacheStatus,
    upstream: Option<String>,
}

/// A successful upstream exchange.
struct Forwarded<'a> {
    body: Bytes,
    envelope: UpstreamEnvelope,
    endpoint: &'a Endpoint,
}

/// Core dispatcher: validation, chain resolution, cache, and the upstream attempt loop.
///
/// One instance is shared by every request. All collaborators are injected, so tests can
/// swap the transport, the resolver, or the cache store.
pub struct ProxyEngine {
    resolver: Arc<dyn ChainConfigResolver>,
    selector: Arc<EndpointSelector>,
    transport: Arc<dyn UpstreamTransport>,
    cache: Option<Arc<ResponseCache>>,
    policy: CachePolicy,
    retry: RetryPolicy,
    default_chain: Option<ChainId>,
    exclude_failed_on_retry: bool,
}

impl ProxyEngine {
    /// Creates an engine without a cache, with default retry settings.
    #[must_use]
    pub fn new(
        resolver: Arc<dyn ChainConfigResolver>,
        selector: Arc<EndpointSelector>,
        transport: Arc<dyn UpstreamTransport>,
    ) -> Self {
        Self {
            resolver,
            selector,
            transport,
            cache: None,
            policy: CachePolicy::default(),
            retry: RetryPolicy::default(),
            default_chain: None,
            exclude_failed_on_retry: false,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ResponseCache>, policy: CachePolicy) -> Self {
        self.cache = Some(cache);
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_default_chain(mut self, chain: Option<ChainId>) -> Self {
        self.default_chain = chain;
        self
    }

    /// Retries skip the endpoint that just failed whenever another candidate exists.
    #[must_use]
    pub fn with_failover_exclusion(mut self, enabled: bool) -> Self {
        self.exclude_failed_on_retry = enabled;
        self
    }

    #[must_use]
    pub fn resolver(&self) -> &Arc<dyn ChainConfigResolver> {
        &self.resolver
    }

    #[must_use]
    pub fn selector(&self) -> &Arc<EndpointSelector> {
        &self.selector
    }

    #[must_use]
    pub fn cache(&self) -> Option<&Arc<ResponseCache>> {
        self.cache.as_ref()
    }

    /// Processes one inbound HTTP body, single request or batch.
    ///
    /// Never fails: every outcome, including undecodable input, is rendered as a JSON-RPC
    /// envelope.
    pub async fn process(&self, body: &[u8], hints: &ChainHints) -> ProxyResponse {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "request body is not valid JSON");
                return ProxyResponse::from_error(&ProxyError::Parse(e.to_string()), RequestId::Null);
            }
        };

        match value {
            Value::Array(items) => self.process_batch(items, hints).await,
            single => {
                let (id, result) = self.process_value(single, hints).await;
                match result {
                    Ok(served) => ProxyResponse {
                        status: 200,
                        body: served.body,
                        cache_status: served.cache_status,
                        upstream: served.upstream,
                    },
                    Err(e) => ProxyResponse::from_error(&e, id),
                }
            }
        }
    }

    /// Dispatches each batch element concurrently and joins the bodies in request order.
    ///
    /// The batch reports `HIT` only when every element was a hit, `MISS` when any element
    /// went upstream through the cache, `BYPASS` otherwise.
    async fn process_batch(&self, items: Vec<Value>, hints: &ChainHints) -> ProxyResponse {
        if items.is_empty() {
            return ProxyResponse::from_error(
                &ProxyError::InvalidRequest("empty batch".to_string()),
                RequestId::Null,
            );
        }

        let count = items.len();
        let results = join_all(items.into_iter().map(|item| self.process_value(item, hints))).await;

        let mut body = BytesMut::new();
        body.put_u8(b'[');
        let mut hits = 0;
        let mut any_miss = false;
        for (i, (id, result)) in results.into_iter().enumerate() {
            if i > 0 {
                body.put_u8(b',');
            }
            match result {
                Ok(served) => {
                    match served.cache_status {
                        CacheStatus::Hit => hits += 1,
                        CacheStatus::Miss => any_miss = true,
                        _ => {}
                    }
                    body.put_slice(&served.body);
                }
                Err(e) => body.put_slice(&render(&e.to_envelope(id))),
            }
        }
        body.put_u8(b']');

        let cache_status = if hits == count {
            CacheStatus::Hit
        } else if any_miss {
            CacheStatus::Miss
        } else {
            CacheStatus::Bypass
        };
        debug!(count, hits, "batch processed");

        ProxyResponse { status: 200, body: body.freeze(), cache_status, upstream: None }
    }

    /// Decodes and serves one envelope, returning the id to echo alongside the result.
    async fn process_value(&self, value: Value, hints: &ChainHints) -> (RequestId, Result<Served, ProxyError>) {
        let request = match decode_request(value) {
            Ok(request) => request,
            Err(rejected) => {
                debug!(error = %rejected.error, "invalid request");
                return (rejected.id, Err(rejected.error.into()));
            }
        };

        let id = request.id_or_null();
        let result = self.process_request(&request, hints).await;
        if let Err(e) = &result {
            if e.is_operational() {
                debug!(method = %request.method, error = %e, "request failed");
            } else {
                error!(method = %request.method, id = %id, error = %e, "internal error while processing request");
            }
        }
        (id, result)
    }

    /// Serves a validated request.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::ChainNotSupported`] if no chain can be resolved or it has no config
    /// - [`ProxyError::NoHealthyUpstream`] if the chain has no active endpoint
    /// - [`ProxyError::Network`] if every attempt failed
    /// - [`ProxyError::Internal`] if the configuration store fails
    async fn process_request(&self, request: &JsonRpcRequest, hints: &ChainHints) -> Result<Served, ProxyError> {
        let params = request.params_slice();
        let chain_id = resolve_chain_id(hints, params, self.default_chain.as_ref())
            .map_err(|e| ProxyError::ChainNotSupported(e.to_string()))?;

        let chain = self
            .resolver
            .get_chain_config(&chain_id)
            .await?
            .ok_or_else(|| ProxyError::ChainNotSupported(chain_id.to_string()))?;

        if chain.active_count() == 0 {
            warn!(chain = %chain_id, "no active endpoints");
            return Err(ProxyError::NoHealthyUpstream(chain_id));
        }

        let cache = self.cache.as_ref().filter(|_| self.policy.is_cacheable(&request.method));
        let cache_key = cache.map(|_| derive_cache_key(&chain_id, &request.method, params));

        if let (Some(cache), Some(key)) = (cache, cache_key.as_deref()) {
            if let Some(cached) = cache.get(key).await {
                if let Some(body) = rewrite_id(&cached, &request.id_or_null()) {
                    debug!(chain = %chain_id, method = %request.method, "cache hit");
                    return Ok(Served { body, cache_status: CacheStatus::Hit, upstream: None });
                }
                warn!(key = key, "cached payload is not a JSON object, ignoring");
            }
        }

        let payload = serde_json::to_vec(request).map_err(|e| ProxyError::Internal(e.to_string()))?;
        let forwarded = self.forward(&chain, Bytes::from(payload)).await?;

        if let (Some(cache), Some(key)) = (cache, cache_key.as_deref()) {
            if !forwarded.envelope.has_error() && !forwarded.envelope.is_null_result() {
                if let Ok(text) = std::str::from_utf8(&forwarded.body) {
                    cache.set(key, text, self.policy.ttl_for(&request.method)).await;
                }
            }
        }

        Ok(Served {
            body: forwarded.body,
            cache_status: if cache.is_some() { CacheStatus::Miss } else { CacheStatus::Bypass },
            upstream: Some(forwarded.endpoint.display_name().to_string()),
        })
    }

    /// The attempt loop: at most `max_retries + 1` attempts with exponential backoff.
    async fn forward<'a>(&self, chain: &'a ChainConfig, payload: Bytes) -> Result<Forwarded<'a>, ProxyError> {
        let max_attempts = self.retry.max_attempts();
        let mut tries: HashMap<&'a str, u32> = HashMap::new();
        let mut exhausted: Vec<&'a str> = Vec::new();
        let mut last_failed: Option<&'a str> = None;
        let mut last_error: Option<UpstreamError> = None;

        for attempt in 0..max_attempts {
            let Some(endpoint) = self.pick_endpoint(chain, &exhausted, last_failed) else {
                break;
            };

            match self.attempt(endpoint, payload.clone()).await {
                AttemptOutcome::Success { body, latency_ms, envelope } => {
                    self.selector.record_latency(&endpoint.url, latency_ms);
                    debug!(
                        chain = %chain.chain_id,
                        upstream = %endpoint.display_name(),
                        attempt,
                        latency_ms,
                        "upstream responded"
                    );
                    return Ok(Forwarded { body, envelope, endpoint });
                }
                AttemptOutcome::Fatal(e) => {
                    error!(chain = %chain.chain_id, upstream = %endpoint.display_name(), error = %e, "fatal upstream error");
                    return Err(e.into());
                }
                AttemptOutcome::Retryable(e) => {
                    warn!(
                        chain = %chain.chain_id,
                        upstream = %endpoint.display_name(),
                        attempt,
                        error_kind = e.kind(),
                        error = %e,
                        "upstream attempt failed"
                    );
                    last_error = Some(e);
                }
            }

            let url = endpoint.url.as_str();
            last_failed = Some(url);
            let count = tries.entry(url).or_insert(0);
            *count += 1;
            if endpoint.max_retries.is_some_and(|max| *count > max) {
                exhausted.push(url);
            }

            if self.retry.should_retry(attempt) {
                let delay = self.retry.calculate_delay(attempt);
                debug!(chain = %chain.chain_id, attempt, delay_ms = delay.as_millis(), "backing off before retry");
                tokio::time::sleep(delay).await;
            }
        }

        match last_error {
            Some(e) => {
                info!(chain = %chain.chain_id, error = %e, "upstream attempts exhausted");
                Err(ProxyError::Network(e.to_string()))
            }
            None => Err(ProxyError::NoHealthyUpstream(chain.chain_id.clone())),
        }
    }

    fn pick_endpoint<'a>(
        &self,
        chain: &'a ChainConfig,
        exhausted: &[&str],
        last_failed: Option<&str>,
    ) -> Option<&'a Endpoint> {
        if self.exclude_failed_on_retry {
            if let Some(failed) = last_failed {
                let mut excluded = exhausted.to_vec();
                excluded.push(failed);
                if let Some(endpoint) = self.selector.select_excluding(chain, &excluded) {
                    return Some(endpoint);
                }
            }
        }
        self.selector.select_excluding(chain, exhausted)
    }

    /// One upstream call bounded by the endpoint's timeout.
    ///
    /// On expiry the transport future is dropped, cancelling the in-flight request.
    async fn attempt(&self, endpoint: &Endpoint, payload: Bytes) -> AttemptOutcome {
        let started = Instant::now();
        let timeout = endpoint.timeout();

        let body = match tokio::time::timeout(timeout, self.transport.send(endpoint, payload)).await {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => return AttemptOutcome::from_error(e),
            Err(_) => return AttemptOutcome::from_error(UpstreamError::Timeout(timeout)),
        };
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match serde_json::from_slice::<UpstreamEnvelope>(&body) {
            Ok(envelope) if envelope.is_well_formed() => AttemptOutcome::Success { body, latency_ms, envelope },
            Ok(_) => AttemptOutcome::Retryable(UpstreamError::InvalidResponse(
                "body is not a JSON-RPC 2.0 response".to_string(),
            )),
            Err(e) => AttemptOutcome::Retryable(UpstreamError::InvalidResponse(e.to_string())),
        }
    }
}

/// Re-emits a cached body with the current caller's id.
fn rewrite_id(cached: &str, id: &RequestId) -> Option<Bytes> {
    let mut value: Value = serde_json::from_str(cached).ok()?;
    value.as_object_mut()?.insert("id".to_string(), id.to_value());
    serde_json::to_vec(&value).ok().map(Bytes::from)
}

fn render(response: &JsonRpcResponse) -> Bytes {
    match serde_json::to_vec(response) {
        Ok(body) => Bytes::from(body),
        Err(e) => {
            error!(error = %e, "failed to serialize error envelope");
            Bytes::from_static(
                br#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error","data":{"operational":false}},"id":null}"#,
            )
        }
    }
}
