//! Which methods are cacheable, and for how long.

use std::{collections::HashMap, time::Duration};

/// Cacheable methods with a dedicated TTL, in seconds.
pub const METHOD_TTLS: &[(&str, u64)] = &[
    ("eth_blockNumber", 5),
    ("eth_getBalance", 30),
    ("eth_getBlockByNumber", 300),
    ("eth_getBlockByHash", 3600),
    ("eth_getTransactionByHash", 3600),
    ("eth_getTransactionReceipt", 3600),
    ("eth_call", 60),
    ("eth_estimateGas", 30),
];

/// Cacheable methods that use the default TTL.
pub const DEFAULT_TTL_METHODS: &[&str] = &[
    "eth_chainId",
    "net_version",
    "eth_gasPrice",
    "eth_getCode",
    "eth_getStorageAt",
    "eth_getLogs",
    "eth_getBlockTransactionCountByHash",
    "eth_getBlockTransactionCountByNumber",
    "eth_getTransactionByBlockHashAndIndex",
    "eth_getTransactionByBlockNumberAndIndex",
];

pub const DEFAULT_TTL_SECONDS: u64 = 60;

/// Method whitelist plus per-method TTLs.
///
/// Methods outside the whitelist (`eth_sendRawTransaction`, `eth_getTransactionCount`, ...)
/// are never written to the cache.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    ttls: HashMap<String, Duration>,
    default_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TTL_SECONDS), &HashMap::new())
    }
}

impl CachePolicy {
    /// Builds the policy from the built-in tables, then applies `overrides` (seconds).
    ///
    /// An override for a method outside the whitelist makes it cacheable.
    #[must_use]
    pub fn new(default_ttl: Duration, overrides: &HashMap<String, u64>) -> Self {
        let mut ttls: HashMap<String, Duration> = METHOD_TTLS
            .iter()
            .map(|(method, secs)| ((*method).to_string(), Duration::from_secs(*secs)))
            .collect();
        for method in DEFAULT_TTL_METHODS {
            ttls.insert((*method).to_string(), default_ttl);
        }
        for (method, secs) in overrides {
            ttls.insert(method.clone(), Duration::from_secs(*secs));
        }
        Self { ttls, default_ttl }
    }

    #[must_use]
    pub fn is_cacheable(&self, method: &str) -> bool {
        self.ttls.contains_key(method)
    }

    /// TTL for `method`; methods without a dedicated entry get the default.
    #[must_use]
    pub fn ttl_for(&self, method: &str) -> Duration {
        self.ttls.get(method).copied().unwrap_or(self.default_ttl)
    }

    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}
