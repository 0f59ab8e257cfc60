//! Cache key derivation for RPC responses.
//!
//! Keys have the form `cache:rpc:<chain>:<method>:<digest>` where `<digest>` is the hex
//! SHA-256 of the params. Params are streamed into the digest rather than serialized into an
//! intermediate string, so large inputs (raw transactions, long calldata) cost one pass.
//!
//! # Encoding
//!
//! Each param contributes a discriminant byte followed by its content:
//! - Null: `0`
//! - Bool: `1` + byte
//! - Number: `2` + length-prefixed decimal text
//! - String: `3` + length-prefixed UTF-8 bytes
//! - Array / Object: `4` / `5` + compact JSON text
//!
//! Params are order-sensitive: `[a, b]` and `[b, a]` produce different keys.
//!
//! Objects are not canonicalized here. `serde_json` is built without `preserve_order`, so
//! parsed objects already iterate in sorted key order and `{"a":1,"b":2}` and
//! `{"b":2,"a":1}` hash identically as a side effect of that map type. Enabling
//! `preserve_order` anywhere in the build would change this.

use crate::{chain::ChainId, store::keys::RPC_RESPONSE_PREFIX};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::{self, Write as _};

/// Derives the store key for a `(chain, method, params)` tuple.
///
/// ```
/// use relay_core::{chain::ChainId, utils::cache_key::derive_cache_key};
/// use serde_json::json;
///
/// let a = derive_cache_key(&ChainId::Numeric(1), "eth_getBalance", &[json!("0xabc"), json!("latest")]);
/// let b = derive_cache_key(&ChainId::Numeric(1), "eth_getBalance", &[json!("0xabc"), json!("latest")]);
/// assert_eq!(a, b);
/// assert!(a.starts_with("cache:rpc:1:eth_getBalance:"));
/// ```
#[must_use]
pub fn derive_cache_key(chain: &ChainId, method: &str, params: &[Value]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((params.len() as u64).to_be_bytes());
    for param in params {
        hash_param(param, &mut hasher);
    }
    let digest = hex::encode(hasher.finalize());
    format!("{RPC_RESPONSE_PREFIX}{chain}:{method}:{digest}")
}

fn hash_param(value: &Value, hasher: &mut Sha256) {
    match value {
        Value::Null => hasher.update([0u8]),
        Value::Bool(b) => hasher.update([1u8, u8::from(*b)]),
        Value::Number(n) => {
            hasher.update([2u8]);
            update_prefixed(hasher, n.to_string().as_bytes());
        }
        Value::String(s) => {
            hasher.update([3u8]);
            update_prefixed(hasher, s.as_bytes());
        }
        Value::Array(_) | Value::Object(_) => {
            hasher.update([if value.is_array() { 4u8 } else { 5u8 }]);
            // DigestSink never returns an error
            let _ = write!(DigestSink(hasher), "{value}");
            hasher.update([0xffu8]);
        }
    }
}

fn update_prefixed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

/// Streams formatted output straight into a digest.
struct DigestSink<'a>(&'a mut Sha256);

impl fmt::Write for DigestSink<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.update(s.as_bytes());
        Ok(())
    }
}
