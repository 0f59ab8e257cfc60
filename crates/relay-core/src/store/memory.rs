//! In-process [`KvStore`] backed by a `DashMap`.
//!
//! Expiry is enforced on read against an injectable [`Clock`]. Entries that are never read
//! again are reclaimed by a sweep: `put` runs one at most once per minimum-TTL period, and
//! [`run_expiry_sweep`] runs one on a fixed interval. TTLs shorter than the configured minimum
//! are rounded up, mirroring hosted KV services whose expiry granularity is coarser than the
//! cache's logical TTLs.

use super::{KvStore, PutOptions, StoreError, StoredValue, ValueMetadata};
use crate::utils::clock::{Clock, SystemClock};
use async_trait::async_trait;
use dashmap::DashMap;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// Hosted KV stores commonly refuse expirations shorter than this.
pub const DEFAULT_MIN_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    metadata: ValueMetadata,
    expires_at_ms: Option<u64>,
}

#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
    min_ttl: Duration,
    last_sweep_ms: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), DEFAULT_MIN_TTL)
    }

    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>, min_ttl: Duration) -> Self {
        let now = clock.now_ms();
        Self { entries: DashMap::new(), clock, min_ttl, last_sweep_ms: AtomicU64::new(now) }
    }

    /// Whether the key is physically present, ignoring expiry.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry whose expiry has passed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.expires_at_ms.is_some_and(|at| at <= now));
        self.last_sweep_ms.store(now, Ordering::Relaxed);
        before.saturating_sub(self.entries.len())
    }

    /// Sweeps from the write path once the previous sweep is a full minimum-TTL period old.
    #[allow(clippy::cast_possible_truncation)]
    fn maybe_sweep(&self) {
        let now = self.clock.now_ms();
        let last = self.last_sweep_ms.load(Ordering::Relaxed);
        if now.saturating_sub(last) < self.min_ttl.as_millis() as u64 {
            return;
        }
        // one writer wins the sweep, the rest carry on
        if self.last_sweep_ms.compare_exchange(last, now, Ordering::AcqRel, Ordering::Relaxed).is_ok() {
            let removed = self.purge_expired();
            trace!(removed, "swept expired store entries on write");
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn expiry_for(&self, ttl: Option<Duration>) -> Option<u64> {
        ttl.map(|ttl| {
            let effective = ttl.max(self.min_ttl);
            self.clock.now_ms().saturating_add(effective.as_millis() as u64)
        })
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
        let now = self.clock.now_ms();
        let expired = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) => match entry.expires_at_ms {
                Some(at) if at <= now => true,
                _ => {
                    return Ok(Some(StoredValue {
                        value: entry.value.clone(),
                        metadata: entry.metadata,
                    }))
                }
            },
        };

        if expired {
            self.entries.remove_if(key, |_, e| e.expires_at_ms.is_some_and(|at| at <= now));
            trace!(key = key, "store entry expired");
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError> {
        let entry = Entry {
            value,
            metadata: options.metadata,
            expires_at_ms: self.expiry_for(options.ttl),
        };
        self.entries.insert(key.to_string(), entry);
        self.maybe_sweep();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Periodically reclaims expired entries until a shutdown signal arrives.
pub async fn run_expiry_sweep(store: Arc<MemoryStore>, period: Duration, mut shutdown_rx: broadcast::Receiver<()>) {
    info!(interval_secs = period.as_secs(), "starting store expiry sweep");

    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let removed = store.purge_expired();
                debug!(removed, remaining = store.len(), "store expiry sweep");
            }
            _ = shutdown_rx.recv() => {
                debug!("store expiry sweep shutting down");
                break;
            }
        }
    }
}
