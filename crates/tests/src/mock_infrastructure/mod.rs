//! Mock infrastructure for testing the relay proxy.
//!
//! ## Components
//!
//! - `RpcMockBuilder`: Wraps mockito to stand in for one upstream JSON-RPC endpoint
//! - Test helpers that wire a `ProxyEngine` to those upstreams
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{engine_for, single_chain, RpcMockBuilder};
//!
//! let mut mock = RpcMockBuilder::new().await;
//! mock.mock_block_number(100, Some(1));
//!
//! let engine = engine_for(vec![single_chain(1, &mock.url())]);
//! ```

pub mod rpc_mock;
pub mod test_helpers;

pub use rpc_mock::RpcMockBuilder;
pub use test_helpers::*;
