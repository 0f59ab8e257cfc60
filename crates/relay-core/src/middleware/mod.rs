//! Request checks applied before any routing work.
//!
//! ```text
//!   Incoming body
//!        │
//!        ▼
//!   ┌─────────────────────────┐
//!   │  JSON parse             │ ──fail──> -32700 Parse error
//!   └─────────────────────────┘
//!        │
//!        ▼
//!   ┌─────────────────────────┐
//!   │  decode_request()       │  strict struct decode
//!   │   - object shape        │  - id: string | number | null
//!   │   - field types         │  - params: array or absent
//!   │  validate()             │  - jsonrpc == "2.0"
//!   │                         │  - non-empty method, id present
//!   └─────────────────────────┘
//!        │ ValidationError?
//!        ├─> -32600 Invalid Request (echoing the id when it has an allowed type)
//!        ▼
//!   chain resolution, cache, upstream
//! ```

pub mod validation;

pub use validation::{decode_request, RejectedRequest, ValidationError};
