//! # Relay Core
//!
//! Core library for the relay multi-chain JSON-RPC reverse proxy.
//!
//! This crate provides the foundational components for:
//!
//! - **[`proxy`]**: The request dispatcher: validation, chain resolution, cache lookup, and
//!   the bounded retry loop over upstream endpoints.
//!
//! - **[`upstream`]**: Weighted-random endpoint selection with latency feedback, and the
//!   HTTP transport used to reach endpoints.
//!
//! - **[`cache`]**: Response cache over the key-value store, with per-method TTLs and gzip
//!   compression of large entries.
//!
//! - **[`chain`]**: Chain ids, endpoint metadata, chain id extraction, and the configuration
//!   resolver.
//!
//! - **[`store`]**: The opaque key-value store seam and its in-memory implementation.
//!
//! - **[`middleware`]**: Strict request decoding and validation.
//!
//! - **[`config`]**: Layered application configuration.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         ProxyEngine                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────┐  │
//! │  │ ChainConfig     │  │ EndpointSelector│  │ Response    │  │
//! │  │ Resolver        │  │ (latency window)│  │ Cache       │  │
//! │  └────────┬────────┘  └────────┬────────┘  └──────┬──────┘  │
//! │           │                    │                  │         │
//! │           │           ┌────────▼────────┐  ┌──────▼──────┐  │
//! │           │           │ UpstreamTransport│ │ compression │  │
//! │           │           │ (reqwest)       │  │ gzip+base64 │  │
//! │           │           └─────────────────┘  └──────┬──────┘  │
//! │  ┌────────▼──────────────────────────────────────▼──────┐  │
//! │  │                 KvStore (MemoryStore)                 │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every collaborator is constructed by the server's composition root and injected into
//! [`proxy::ProxyEngine`]; nothing in this crate holds global state.

pub mod cache;
pub mod chain;
pub mod config;
pub mod middleware;
pub mod proxy;
pub mod store;
pub mod types;
pub mod upstream;
pub mod utils;
