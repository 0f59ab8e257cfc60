//! Layered configuration loading: file, then `RELAY__` environment overrides.

use std::{env, fs, path::PathBuf};

use relay_core::{chain::ChainId, config::AppConfig};
use serial_test::serial;

const CONFIG_TOML: &str = r#"
[server]
bind_port = 4040
request_timeout_seconds = 15

[proxy]
max_retries = 2
base_delay_ms = 50
exclude_failed_on_retry = true
default_chain = 1

[cache]
default_ttl_seconds = 30

[[cache.ttl_overrides]]
method = "eth_getLogs"
ttl_seconds = 900

[[chains]]
chain_id = 1
name = "Ethereum"

[[chains.endpoints]]
url = "https://eth-a.example.com"
name = "eth-a"
priority = 10

[[chains.endpoints]]
url = "https://eth-b.example.com"
priority = 5
timeout_ms = 2500
max_retries = 1

[[chains]]
chain_id = "sol-main"

[[chains.endpoints]]
url = "https://sol.example.com"
auth = "token"
"#;

struct TempConfig {
    path: PathBuf,
}

impl TempConfig {
    fn write(tag: &str, contents: &str) -> Self {
        let path = env::temp_dir().join(format!("relay-{tag}-{}.toml", std::process::id()));
        fs::write(&path, contents).expect("temp config should be writable");
        Self { path }
    }
}

impl Drop for TempConfig {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn clear_overrides() {
    for key in ["RELAY__SERVER__BIND_PORT", "RELAY__PROXY__DEFAULT_CHAIN", "RELAY__LOGGING__FORMAT"] {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_file_values_loaded() {
    clear_overrides();
    let file = TempConfig::write("file", CONFIG_TOML);

    let config = AppConfig::from_file(&file.path).expect("config should load");
    assert!(config.validate().is_ok());

    assert_eq!(config.server.bind_port, 4040);
    assert_eq!(config.server.bind_address, "127.0.0.1");
    assert_eq!(config.request_timeout().as_secs(), 15);
    assert_eq!(config.proxy.default_chain, Some(ChainId::Numeric(1)));
    assert!(config.proxy.exclude_failed_on_retry);

    let retry = config.retry_policy();
    assert_eq!(retry.max_attempts(), 3);
    assert_eq!(retry.calculate_delay(1).as_millis(), 100);

    let policy = config.cache_policy();
    assert_eq!(policy.ttl_for("eth_getLogs").as_secs(), 900);
    assert_eq!(policy.ttl_for("eth_chainId").as_secs(), 30);

    assert_eq!(config.chains.len(), 2);
    let eth = &config.chains[0];
    assert_eq!(eth.endpoints[0].display_name(), "eth-a");
    assert_eq!(eth.endpoints[1].display_name(), "https://eth-b.example.com");
    assert_eq!(eth.endpoints[1].timeout().as_millis(), 2500);
    assert_eq!(eth.endpoints[1].max_retries, Some(1));

    let sol = &config.chains[1];
    assert_eq!(sol.chain_id, ChainId::Named("sol-main".into()));
    assert_eq!(sol.endpoints[0].auth.as_deref(), Some("token"));
    assert!(sol.endpoints[0].active);
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_overrides();
    let file = TempConfig::write("env", CONFIG_TOML);

    env::set_var("RELAY__SERVER__BIND_PORT", "9090");
    env::set_var("RELAY__PROXY__DEFAULT_CHAIN", "137");
    let config = AppConfig::from_file(&file.path);
    clear_overrides();

    let config = config.expect("config should load");
    assert_eq!(config.server.bind_port, 9090);
    assert_eq!(config.proxy.default_chain, Some(ChainId::Numeric(137)));
    assert_eq!(config.proxy.max_retries, 2);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    clear_overrides();
    let path = env::temp_dir().join("relay-does-not-exist.toml");

    let config = AppConfig::from_file(&path).expect("missing file is not an error");
    assert_eq!(config.server.bind_port, 3030);
    assert_eq!(config.proxy.max_retries, 3);
    assert!(config.cache.enabled);
    assert!(config.chains.is_empty());
    assert!(config.proxy.default_chain.is_none());
}

#[test]
#[serial]
fn test_invalid_override_fails_validation() {
    clear_overrides();
    let file = TempConfig::write("invalid", CONFIG_TOML);

    env::set_var("RELAY__LOGGING__FORMAT", "xml");
    let config = AppConfig::from_file(&file.path);
    clear_overrides();

    let config = config.expect("config should load");
    assert!(config.validate().is_err());
}

#[test]
#[serial]
fn test_duplicate_chain_rejected() {
    clear_overrides();
    let duplicated = format!(
        "{CONFIG_TOML}\n[[chains]]\nchain_id = \"0x1\"\n\n[[chains.endpoints]]\nurl = \"https://dup.example.com\"\n"
    );
    let file = TempConfig::write("dup", &duplicated);

    let config = AppConfig::from_file(&file.path).expect("config should load");
    let err = config.validate().expect_err("duplicate chain ids must be rejected");
    assert!(err.contains("Duplicate chain id"));
}
