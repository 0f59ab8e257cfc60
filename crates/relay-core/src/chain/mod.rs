//! Chain identity and per-chain endpoint configuration.
//!
//! A chain is addressed by a [`ChainId`], which is either an EVM-style integer or an opaque
//! string for namespaces that do not use numeric ids (`"sol-main"`, `"cosmoshub-4"`).
//! Every store lookup goes through [`ChainId::storage_key`], so `1` and `"1"` address the
//! same configuration.
//!
//! - [`extract`]: pulls a chain id out of an inbound request (path, query, body, default)
//! - [`resolver`]: the [`ChainConfigResolver`] seam and its store-backed implementation

pub mod extract;
pub mod resolver;

pub use extract::{resolve_chain_id, ChainHints, ResolveError};
pub use resolver::{
    seed_chains, ChainConfigResolver, ResolverError, StaticChainResolver, StoreChainResolver,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, sync::Arc, time::Duration};

/// Identifier of a logical chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChainId {
    Numeric(u64),
    Named(Arc<str>),
}

impl ChainId {
    /// Parses a chain id from text, coercing numeric-looking strings to integers.
    ///
    /// Decimal digits and `0x`-prefixed hex both count as numeric. Anything else that is
    /// non-empty after trimming becomes a [`ChainId::Named`].
    ///
    /// ```
    /// use relay_core::chain::ChainId;
    ///
    /// assert_eq!(ChainId::parse("137"), Some(ChainId::Numeric(137)));
    /// assert_eq!(ChainId::parse("0x89"), Some(ChainId::Numeric(137)));
    /// assert_eq!(ChainId::parse("sol-main"), Some(ChainId::Named("sol-main".into())));
    /// assert_eq!(ChainId::parse("  "), None);
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = trimmed.parse::<u64>() {
                return Some(Self::Numeric(n));
            }
        }

        if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                if let Ok(n) = u64::from_str_radix(hex, 16) {
                    return Some(Self::Numeric(n));
                }
            }
        }

        Some(Self::Named(Arc::from(trimmed)))
    }

    /// Canonical key used to address this chain in the store.
    #[must_use]
    pub fn storage_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Named(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ChainId {
    fn from(n: u64) -> Self {
        Self::Numeric(n)
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Numeric(n) => serializer.serialize_u64(*n),
            Self::Named(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Numeric(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Numeric(n) => Ok(Self::Numeric(n)),
            Raw::Text(s) => {
                Self::parse(&s).ok_or_else(|| serde::de::Error::custom("empty chain id"))
            }
        }
    }
}

/// An upstream JSON-RPC server for one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Unique within its chain.
    pub url: String,

    /// Display name, reported in logs and the `x-upstream` header. Defaults to the url.
    #[serde(default)]
    pub name: String,

    /// Relative selection weight. Must be greater than 0. Defaults to `1`.
    #[serde(default = "default_priority")]
    pub priority: u32,

    /// Hard timeout for a single upstream call, in milliseconds. Defaults to `10000`.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// How many times this endpoint may be tried within one request.
    ///
    /// `None` leaves the endpoint bounded only by the request-wide attempt budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Cleared by the external health prober when the endpoint fails its checks.
    #[serde(default = "default_active")]
    pub active: bool,

    /// Bearer credential sent as `Authorization: Bearer <auth>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

fn default_priority() -> u32 {
    1
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_active() -> bool {
    true
}

impl Endpoint {
    #[must_use]
    pub fn new(url: impl Into<String>, priority: u32) -> Self {
        let url = url.into();
        Self {
            name: url.clone(),
            url,
            priority,
            timeout_ms: default_timeout_ms(),
            max_retries: None,
            active: true,
            auth: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    #[must_use]
    pub fn with_auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name used for display, falling back to the url when none was configured.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.url
        } else {
            &self.name
        }
    }
}

/// Configuration of one logical chain.
///
/// Read once per request and treated as immutable for its duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: ChainId,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub symbol: String,

    /// Ordered; order only matters as the tie-break fallback of the selector.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

impl ChainConfig {
    #[must_use]
    pub fn new(chain_id: impl Into<ChainId>, endpoints: Vec<Endpoint>) -> Self {
        Self {
            chain_id: chain_id.into(),
            name: String::new(),
            symbol: String::new(),
            endpoints,
            explorer_url: None,
        }
    }

    pub fn active_endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter().filter(|e| e.active)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active_endpoints().count()
    }

    #[must_use]
    pub fn endpoint(&self, url: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.url == url)
    }

    /// Checks the per-chain invariants: unique urls, positive priorities and timeouts.
    ///
    /// # Errors
    ///
    /// Returns a descriptive message for the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for endpoint in &self.endpoints {
            if !endpoint.url.starts_with("http://") && !endpoint.url.starts_with("https://") {
                return Err(format!(
                    "chain {}: endpoint url must be http(s): {}",
                    self.chain_id, endpoint.url
                ));
            }
            if !seen.insert(endpoint.url.as_str()) {
                return Err(format!("chain {}: duplicate endpoint url {}", self.chain_id, endpoint.url));
            }
            if endpoint.priority == 0 {
                return Err(format!(
                    "chain {}: endpoint {} has priority 0",
                    self.chain_id, endpoint.url
                ));
            }
            if endpoint.timeout_ms == 0 {
                return Err(format!(
                    "chain {}: endpoint {} has timeout 0",
                    self.chain_id, endpoint.url
                ));
            }
        }
        Ok(())
    }
}
