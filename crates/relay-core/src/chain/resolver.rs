//! Chain configuration lookup.
//!
//! The dispatcher reads one [`ChainConfig`] per request through [`ChainConfigResolver`].
//! [`StoreChainResolver`] serves it from the KV store, keeping a short-lived copy under the
//! chain-config cache namespace in front of the authoritative `config:` entry.

use super::{ChainConfig, ChainId};
use crate::store::{keys, KvStore, PutOptions, StoreError};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_CHAIN_CONFIG_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("chain config store error: {0}")]
    Store(#[from] StoreError),

    #[error("stored config for chain {chain} is malformed: {source}")]
    Corrupt { chain: ChainId, source: serde_json::Error },
}

/// Supplies chain configuration by chain id.
#[async_trait]
pub trait ChainConfigResolver: Send + Sync + 'static {
    /// Returns `Ok(None)` for chains that are not configured.
    async fn get_chain_config(&self, chain: &ChainId) -> Result<Option<ChainConfig>, ResolverError>;
}

/// Fixed in-memory chain table.
#[derive(Debug, Default, Clone)]
pub struct StaticChainResolver {
    chains: HashMap<ChainId, ChainConfig>,
}

impl StaticChainResolver {
    #[must_use]
    pub fn new(chains: impl IntoIterator<Item = ChainConfig>) -> Self {
        Self { chains: chains.into_iter().map(|c| (c.chain_id.clone(), c)).collect() }
    }
}

#[async_trait]
impl ChainConfigResolver for StaticChainResolver {
    async fn get_chain_config(&self, chain: &ChainId) -> Result<Option<ChainConfig>, ResolverError> {
        Ok(self.chains.get(chain).cloned())
    }
}

/// Store-backed resolver with a read-through chain-config cache.
pub struct StoreChainResolver {
    store: Arc<dyn KvStore>,
    cache_ttl: Duration,
}

impl StoreChainResolver {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store, cache_ttl: DEFAULT_CHAIN_CONFIG_CACHE_TTL }
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    async fn cached(&self, chain: &ChainId) -> Option<ChainConfig> {
        let key = keys::chain_config_cache(chain);
        match self.store.get(&key).await {
            Ok(Some(stored)) => match serde_json::from_str(&stored.value) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!(chain = %chain, error = %e, "discarding malformed chain config cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(chain = %chain, error = %e, "chain config cache read failed");
                None
            }
        }
    }

    async fn populate_cache(&self, chain: &ChainId, raw: String) {
        let key = keys::chain_config_cache(chain);
        if let Err(e) = self.store.put(&key, raw, PutOptions::with_ttl(self.cache_ttl)).await {
            warn!(chain = %chain, error = %e, "chain config cache write failed");
        }
    }
}

#[async_trait]
impl ChainConfigResolver for StoreChainResolver {
    async fn get_chain_config(&self, chain: &ChainId) -> Result<Option<ChainConfig>, ResolverError> {
        if let Some(config) = self.cached(chain).await {
            return Ok(Some(config));
        }

        let Some(stored) = self.store.get(&keys::chain_config(chain)).await? else {
            debug!(chain = %chain, "chain not configured");
            return Ok(None);
        };

        let config: ChainConfig = serde_json::from_str(&stored.value)
            .map_err(|source| ResolverError::Corrupt { chain: chain.clone(), source })?;

        self.populate_cache(chain, stored.value).await;
        Ok(Some(config))
    }
}

/// Writes `chains` into the configuration namespace, dropping any cached copies.
///
/// # Errors
///
/// Returns the first store failure encountered.
pub async fn seed_chains(store: &dyn KvStore, chains: &[ChainConfig]) -> Result<(), StoreError> {
    for chain in chains {
        let raw = serde_json::to_string(chain)?;
        store.put(&keys::chain_config(&chain.chain_id), raw, PutOptions::default()).await?;
        store.delete(&keys::chain_config_cache(&chain.chain_id)).await?;
        debug!(chain = %chain.chain_id, endpoints = chain.endpoints.len(), "seeded chain config");
    }
    Ok(())
}
