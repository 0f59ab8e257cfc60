//! Integration tests for the relay JSON-RPC proxy.
//!
//! This crate contains various test modules:
//!
//! - `proxy_engine_tests`: validation, chain resolution, caching and batching through a real
//!   HTTP transport against mock upstreams
//! - `failover_tests`: retry bounds, failover between endpoints, credentials
//! - `store_resolver_tests`: chain configuration seeded into and resolved from the store
//! - `config_tests`: layered configuration loading
//! - `mock_infrastructure`: Reusable mock upstreams and engine builders
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```
//!
//! Upstreams are mockito servers bound to localhost; no external network access is needed.

#[cfg(test)]
mod proxy_engine_tests;

#[cfg(test)]
mod failover_tests;

#[cfg(test)]
mod store_resolver_tests;

#[cfg(test)]
mod config_tests;

/// Mock infrastructure for testing
pub mod mock_infrastructure;
