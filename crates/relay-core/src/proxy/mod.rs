//! Request dispatching: from an inbound body to a rendered JSON-RPC reply.
//!
//! # Request Processing Flow
//!
//! ```text
//! Client body
//!       │
//!       ▼
//! ┌─────────────┐
//! │ JSON parse  │ ─── fail ──► -32700 (HTTP 400)
//! └──────┬──────┘
//!        │ array? ──► each element below, concurrently, joined in order
//!        ▼
//! ┌─────────────┐
//! │  Validation │ ─── fail ──► -32600 (HTTP 400), id echoed when usable
//! └──────┬──────┘
//!        ▼
//! ┌─────────────────┐
//! │ Resolve chain   │ path > query > body param > default
//! │ Load config     │ ─── unknown ──► -32001
//! │ Active count    │ ─── zero ─────► -32002, no upstream call
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │  Cache lookup   │ ─── hit ──► cached body, id rewritten
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────────────────────────────┐
//! │ Attempt loop (max_retries + 1 attempts) │
//! │   select endpoint (weighted random)     │
//! │   send under endpoint timeout           │
//! │   Success ─► stop                       │
//! │   Retryable ─► sleep base * 2^attempt   │
//! │   Fatal ─► -32603                       │
//! └────────┬────────────────────────────────┘
//!          │ exhausted ──► -32003 with the last failure
//!          ▼
//! cache store (whitelisted, no error, non-null result)
//! latency record for the serving endpoint
//! upstream body passed through verbatim
//! ```
//!
//! # Error Codes
//!
//! | Error | Code | HTTP |
//! |-------|------|------|
//! | Parse | -32700 | 400 |
//! | Invalid request | -32600 | 400 |
//! | Chain not supported | -32001 | 200 |
//! | No healthy upstream | -32002 | 200 |
//! | Network | -32003 | 200 |
//! | Internal | -32603 | 200 |

pub mod engine;
pub mod errors;
pub mod retry;

pub use engine::{ProxyEngine, ProxyResponse};
pub use errors::ProxyError;
pub use retry::{AttemptOutcome, RetryPolicy};
