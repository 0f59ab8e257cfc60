//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `RELAY_CONFIG` env var
//! 3. **Environment variables**: `RELAY__SECTION__FIELD` overrides specific fields
//!
//! # Configuration Sections
//!
//! - [`ServerConfig`]: HTTP server settings (bind address, concurrency, limits)
//! - [`ProxyConfig`]: Retry bounds, backoff and the default chain
//! - [`CacheConfig`]: Response cache switch, TTLs, compression threshold
//! - [`StoreConfig`]: Key-value store granularity and chain-config cache TTL
//! - [`ChainConfig`]: Chains and their upstream endpoints, seeded into the store at startup
//! - [`LoggingConfig`]: Log level and format
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind_port = 3030
//!
//! [proxy]
//! max_retries = 3
//! default_chain = 1
//!
//! [[chains]]
//! chain_id = 1
//! name = "Ethereum"
//!
//! [[chains.endpoints]]
//! url = "https://eth.example.com"
//! priority = 10
//! timeout_ms = 5000
//! ```

use crate::{
    cache::CachePolicy,
    chain::{ChainConfig, ChainId},
    proxy::RetryPolicy,
};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path, time::Duration};

/// HTTP server configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address to bind the server to. Defaults to `127.0.0.1`.
    pub bind_address: String,

    /// Port number to listen on. Must be greater than 0. Defaults to `3030`.
    pub bind_port: u16,

    /// Requests processed at once; further requests wait. Defaults to `1000`.
    pub max_concurrent_requests: usize,

    /// Outer deadline for one inbound request, in seconds. Defaults to `30`.
    pub request_timeout_seconds: u64,

    /// Largest accepted request body. Defaults to 1 MiB.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 3030,
            max_concurrent_requests: 1000,
            request_timeout_seconds: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Upstream retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,

    /// Retries avoid the endpoint that just failed when another one is available.
    pub exclude_failed_on_retry: bool,

    /// Chain used when a request names none.
    pub default_chain: Option<ChainId>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            max_retries: retry.max_retries,
            base_delay_ms: retry.base_delay_ms,
            max_delay_ms: retry.max_delay_ms,
            jitter_factor: retry.jitter_factor,
            exclude_failed_on_retry: false,
            default_chain: None,
        }
    }
}

/// A per-method TTL override.
///
/// Kept as a list of tables rather than a map: method names are case-sensitive and map
/// keys do not survive environment overrides intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlOverride {
    pub method: String,
    pub ttl_seconds: u64,
}

/// Response cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether responses are cached at all. Defaults to `true`.
    pub enabled: bool,

    /// TTL for whitelisted methods without a dedicated entry. Defaults to `60`.
    pub default_ttl_seconds: u64,

    /// Serialized entries at least this large are gzip-compressed. Defaults to `1024`.
    pub compression_threshold_bytes: usize,

    /// Merged over the built-in method table. An override also whitelists its method.
    pub ttl_overrides: Vec<TtlOverride>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_seconds: crate::cache::policy::DEFAULT_TTL_SECONDS,
            compression_threshold_bytes: crate::cache::DEFAULT_MIN_COMPRESS_SIZE,
            ttl_overrides: Vec::new(),
        }
    }
}

/// Key-value store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Shortest expiry the store honours; shorter TTLs are rounded up. Defaults to `60`.
    pub min_ttl_seconds: u64,

    /// How long a resolved chain config is cached. Defaults to `60`.
    pub chain_config_cache_ttl_seconds: u64,

    /// Period of the background sweep that reclaims expired entries. Defaults to `60`.
    pub sweep_interval_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { min_ttl_seconds: 60, chain_config_cache_ttl_seconds: 60, sweep_interval_seconds: 60 }
    }
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub store: StoreConfig,

    /// Chains seeded into the configuration namespace at startup.
    #[serde(default)]
    pub chains: Vec<ChainConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// Environment variables with the `RELAY__` prefix can override any configuration value.
    /// Use `__` as a separator for nested fields (e.g., `RELAY__SERVER__BIND_PORT=8080`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or deserialized. A missing file
    /// is not an error.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_builder = Config::builder()
            .set_default("server.bind_address", "127.0.0.1")?
            .set_default("server.bind_port", 3030)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("RELAY").prefix_separator("__").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/config.toml` with fallback to defaults.
    ///
    /// The config file path can be overridden using the `RELAY_CONFIG` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("RELAY_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Returns the parsed socket address for the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns an error string if the address cannot be parsed into a valid [`SocketAddr`].
    ///
    /// [`SocketAddr`]: std::net::SocketAddr
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.bind_port)
            .parse()
            .map_err(|_| {
                format!("Invalid socket address: {}:{}", self.server.bind_address, self.server.bind_port)
            })
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_retries(self.proxy.max_retries)
            .with_base_delay_ms(self.proxy.base_delay_ms)
            .with_max_delay_ms(self.proxy.max_delay_ms)
            .with_jitter_factor(self.proxy.jitter_factor)
    }

    #[must_use]
    pub fn cache_policy(&self) -> CachePolicy {
        let overrides: HashMap<String, u64> = self
            .cache
            .ttl_overrides
            .iter()
            .map(|o| (o.method.clone(), o.ttl_seconds))
            .collect();
        CachePolicy::new(Duration::from_secs(self.cache.default_ttl_seconds), &overrides)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// Checks include:
    /// - Every chain passes [`ChainConfig::validate`] and chain ids are unique
    /// - Numeric limits are greater than zero where required
    /// - Logging format is either `"json"` or `"pretty"`
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for chain in &self.chains {
            chain.validate()?;
            if !seen.insert(chain.chain_id.storage_key()) {
                return Err(format!("Duplicate chain id: {}", chain.chain_id));
            }
        }

        if self.server.max_concurrent_requests == 0 {
            return Err("Max concurrent requests must be greater than 0".to_string());
        }

        if self.server.bind_port == 0 {
            return Err("Bind port must be greater than 0".to_string());
        }

        if self.server.request_timeout_seconds == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }

        if self.store.sweep_interval_seconds == 0 {
            return Err("Store sweep interval must be greater than 0".to_string());
        }

        if self.cache.default_ttl_seconds == 0 {
            return Err("Cache TTL must be greater than 0".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}
