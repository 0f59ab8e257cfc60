//! Response caching for idempotent RPC methods.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        ResponseCache                          │
//! │  get / set / delete, envelope {payload, written_at_ms, ttl}   │
//! └───────────────┬───────────────────────────────┬───────────────┘
//!                 │                               │
//!         ┌───────▼───────┐               ┌───────▼───────┐
//!         │  compression  │               │  CachePolicy  │
//!         │ gzip + base64 │               │ whitelist and │
//!         │ above 1 KiB   │               │ per-method TTL│
//!         └───────┬───────┘               └───────────────┘
//!                 │
//!         ┌───────▼───────────────────────────────────────┐
//!         │        KvStore (cache:rpc:<chain>:<method>:…) │
//!         └───────────────────────────────────────────────┘
//! ```
//!
//! Keys come from [`derive_cache_key`](crate::utils::cache_key::derive_cache_key).
//! Nothing in this module ever fails a request: see [`ResponseCache`] for the degraded path.

pub mod compression;
pub mod policy;
pub mod response_cache;

pub use compression::{CompressionError, Decoded, DEFAULT_MIN_COMPRESS_SIZE};
pub use policy::CachePolicy;
pub use response_cache::{CacheError, CacheStats, ResponseCache};
