//! Small shared helpers.
//!
//! - [`cache_key`]: stable cache key derivation from `(chain, method, params)`
//! - [`clock`]: wall-clock abstraction so expiry can be tested without sleeping

pub mod cache_key;
pub mod clock;

pub use cache_key::derive_cache_key;
pub use clock::{Clock, ManualClock, SystemClock};
