//! Opaque key-value store seam.
//!
//! All persisted state (chain configuration, cached responses, health results) lives behind
//! [`KvStore`], addressed by string keys under the namespaces in [`keys`]. The store is
//! treated as eventually consistent: the cache layer re-checks expiry on read and never lets
//! a store failure reach the caller.
//!
//! [`MemoryStore`] is the in-process implementation used by the server and the tests.

pub mod memory;

pub use memory::{run_expiry_sweep, MemoryStore};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Key namespaces.
pub mod keys {
    use crate::chain::ChainId;

    /// Chain configuration, written by the admin surface or seeded from the config file.
    pub const CONFIG_PREFIX: &str = "config:chain:";
    /// Cached upstream responses.
    pub const RPC_RESPONSE_PREFIX: &str = "cache:rpc:";
    /// Short-lived copies of chain configuration.
    pub const CHAIN_CONFIG_CACHE_PREFIX: &str = "cache:chain:";
    /// Cached health summaries. Written by the external prober only.
    pub const HEALTH_CACHE_PREFIX: &str = "cache:health:";
    /// Raw health results. Written by the external prober only.
    pub const HEALTH_PREFIX: &str = "health:";

    #[must_use]
    pub fn chain_config(chain: &ChainId) -> String {
        format!("{CONFIG_PREFIX}{}", chain.storage_key())
    }

    #[must_use]
    pub fn chain_config_cache(chain: &ChainId) -> String {
        format!("{CHAIN_CONFIG_CACHE_PREFIX}{}", chain.storage_key())
    }
}

/// Sidecar metadata stored alongside a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMetadata {
    /// The value is base64 of a gzip stream rather than raw text.
    #[serde(default)]
    pub compressed: bool,
}

/// A value read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    pub value: String,
    pub metadata: ValueMetadata,
}

/// Options for [`KvStore::put`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PutOptions {
    /// Store-level expiry. Stores may round this up to their own granularity.
    pub ttl: Option<Duration>,
    pub metadata: ValueMetadata,
}

impl PutOptions {
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl), metadata: ValueMetadata::default() }
    }
}

/// Errors returned by a [`KvStore`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The backing service could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be encoded or decoded.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Text key-value store with per-key expiry and sidecar metadata.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Reads a value and its metadata. Expired keys read as `None`.
    async fn get(&self, key: &str) -> Result<Option<StoredValue>, StoreError>;

    /// Writes a value, replacing any previous one.
    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError>;

    /// Removes a key. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
