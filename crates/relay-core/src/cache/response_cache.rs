//! TTL cache over a [`KvStore`].
//!
//! Each value is wrapped in an envelope recording when it was written and for how long it is
//! valid. The envelope is the source of truth for expiry: stores round TTLs to their own
//! granularity, so an entry can outlive its logical TTL in the store and is deleted on the
//! first read that finds it stale.
//!
//! Every failure in this layer (store, codec, envelope) is reported through the `try_*`
//! methods as a [`CacheError`]. The plain `get` / `set` / `delete` methods log it as a
//! degraded operation and carry on as if the cache were absent.

use super::compression::{self, CompressionError, DEFAULT_MIN_COMPRESS_SIZE};
use crate::{
    store::{KvStore, PutOptions, StoreError, ValueMetadata},
    utils::clock::{Clock, SystemClock},
};
use serde::{Deserialize, Serialize};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, trace, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Compression(#[from] CompressionError),

    #[error("cache envelope error: {0}")]
    Envelope(#[from] serde_json::Error),
}

/// Stored form of a cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    payload: String,
    written_at_ms: u64,
    ttl: u64,
}

impl CacheEnvelope {
    fn is_expired(&self, now_ms: u64) -> bool {
        self.written_at_ms.saturating_add(self.ttl.saturating_mul(1000)) <= now_ms
    }
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub expired: u64,
    pub degraded: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    expired: AtomicU64,
    degraded: AtomicU64,
}

pub struct ResponseCache {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    min_compress_size: usize,
    counters: Counters,
}

impl ResponseCache {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock, min_compress_size: DEFAULT_MIN_COMPRESS_SIZE, counters: Counters::default() }
    }

    #[must_use]
    pub fn with_min_compress_size(mut self, min_compress_size: usize) -> Self {
        self.min_compress_size = min_compress_size;
        self
    }

    /// Returns the cached value, or `None` on miss, expiry, or any cache failure.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.try_get(key).await {
            Ok(Some(value)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.degraded("get", key, &e);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores `value` for `ttl`. Failures are logged and dropped.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) {
        match self.try_set(key, value, ttl).await {
            Ok(()) => {
                self.counters.writes.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => self.degraded("set", key, &e),
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            self.degraded("delete", key, &e.into());
        }
    }

    /// # Errors
    ///
    /// Returns a [`CacheError`] if the store read fails, a compressed entry cannot be
    /// decoded, or the envelope is malformed.
    pub async fn try_get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let Some(stored) = self.store.get(key).await? else {
            trace!(key = key, "cache miss");
            return Ok(None);
        };

        let text = if stored.metadata.compressed {
            let decoded = compression::decode_from_store(&stored.value);
            if let compression::Decoded::Fallback { error, .. } = &decoded {
                warn!(key = key, error = %error, "compressed cache entry did not inflate, using raw value");
            }
            decoded.into_text().into_owned()
        } else {
            stored.value
        };

        let envelope: CacheEnvelope = serde_json::from_str(&text)?;
        if envelope.is_expired(self.clock.now_ms()) {
            debug!(key = key, written_at_ms = envelope.written_at_ms, ttl = envelope.ttl, "cache entry expired");
            self.counters.expired.fetch_add(1, Ordering::Relaxed);
            self.store.delete(key).await?;
            return Ok(None);
        }

        trace!(key = key, "cache hit");
        Ok(Some(envelope.payload))
    }

    /// # Errors
    ///
    /// Returns a [`CacheError`] if the envelope cannot be serialized, compression fails, or
    /// the store write fails.
    pub async fn try_set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let envelope = CacheEnvelope {
            payload: value.to_string(),
            written_at_ms: self.clock.now_ms(),
            ttl: ttl.as_secs(),
        };
        let serialized = serde_json::to_string(&envelope)?;

        let compressed = compression::should_compress(&serialized, self.min_compress_size);
        let stored = if compressed { compression::encode_for_store(&serialized)? } else { serialized };

        trace!(key = key, ttl_secs = ttl.as_secs(), compressed, bytes = stored.len(), "cache write");
        self.store
            .put(key, stored, PutOptions { ttl: Some(ttl), metadata: ValueMetadata { compressed } })
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            expired: self.counters.expired.load(Ordering::Relaxed),
            degraded: self.counters.degraded.load(Ordering::Relaxed),
        }
    }

    fn degraded(&self, operation: &'static str, key: &str, error: &CacheError) {
        self.counters.degraded.fetch_add(1, Ordering::Relaxed);
        warn!(operation, key = key, error = %error, "cache degraded, continuing without cache");
    }
}
