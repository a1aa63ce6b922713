use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::error::MatchError;
use crate::store::SnapshotBackendConfig;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in KB
    #[serde(default = "default_max_body_size_kb")]
    pub max_body_size_kb: usize,

    /// Rate limit: requests per minute per API key
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    /// API keys accepted on `/api/v1/*`
    #[serde(default)]
    pub api_keys: HashSet<String>,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level or full `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Expose `/metrics`
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

/// `[cache]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSettings {
    /// Lifetime of a ranked pool in both tiers.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Page size when a request carries no `limit`.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            default_limit: default_limit(),
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageSettings {
    /// Redb file for the durable tier. In-memory when unset.
    #[serde(default)]
    pub snapshot_path: Option<String>,

    /// JSON file of subjects and candidates loaded at startup.
    #[serde(default)]
    pub seed_path: Option<String>,
}

impl StorageSettings {
    pub fn snapshot_backend(&self) -> SnapshotBackendConfig {
        match &self.snapshot_path {
            Some(path) => SnapshotBackendConfig::redb(path.clone()),
            None => SnapshotBackendConfig::in_memory(),
        }
    }
}

/// Key accepted when none are configured.
pub const DEMO_API_KEY: &str = "demo-key-change-me";

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_kb: default_max_body_size_kb(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            api_keys: HashSet::new(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            cache: CacheSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `mentormatch.{toml,yaml,json}`
    /// file and `MENTORMATCH__*` environment variables, in that order.
    ///
    /// Nested keys use `__`, e.g. `MENTORMATCH__CACHE__TTL_SECS=600`.
    /// `MENTORMATCH__API_KEYS` takes a comma-separated list.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("mentormatch").required(false))
            .add_source(
                config::Environment::with_prefix("MENTORMATCH")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("api_keys")
                    .try_parsing(true),
            );

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;

        config.apply_demo_key_fallback();
        config.validate()?;
        Ok(config)
    }

    /// Insert [`DEMO_API_KEY`] when no keys are configured. Returns whether it did.
    pub fn apply_demo_key_fallback(&mut self) -> bool {
        if !self.api_keys.is_empty() {
            return false;
        }
        self.api_keys.insert(DEMO_API_KEY.to_string());
        true
    }

    /// True when the only accepted key is [`DEMO_API_KEY`].
    pub fn uses_demo_key(&self) -> bool {
        self.api_keys.len() == 1 && self.api_keys.contains(DEMO_API_KEY)
    }

    /// Reject values the cache would refuse at startup.
    pub fn validate(&self) -> Result<(), MatchError> {
        self.cache_config()?;
        if self.cache.default_limit == 0 {
            return Err(MatchError::Validation(
                "cache.default_limit must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn cache_config(&self) -> Result<CacheConfig, MatchError> {
        CacheConfig::new(Duration::from_secs(self.cache.ttl_secs))
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_kb * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_kb() -> usize {
    256
}

fn default_rate_limit_per_minute() -> u32 {
    600
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_limit() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.cache.ttl_secs, 300);
        assert_eq!(cfg.cache.default_limit, 10);
        assert!(cfg.storage.snapshot_path.is_none());
        assert!(cfg.enable_cors);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_demo_key_fallback_only_when_no_keys() {
        let mut cfg = ServerConfig::default();
        assert!(cfg.apply_demo_key_fallback());
        assert!(cfg.uses_demo_key());
        assert!(!cfg.apply_demo_key_fallback());

        let mut keyed = ServerConfig::default();
        keyed.api_keys.insert("real-key".into());
        assert!(!keyed.apply_demo_key_fallback());
        assert!(!keyed.uses_demo_key());
        assert_eq!(keyed.api_keys.len(), 1);
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_zero_ttl_fails_validation() {
        let mut cfg = ServerConfig::default();
        cfg.cache.ttl_secs = 0;
        assert!(matches!(cfg.validate(), Err(MatchError::Validation(_))));
    }

    #[test]
    fn test_zero_default_limit_fails_validation() {
        let mut cfg = ServerConfig::default();
        cfg.cache.default_limit = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_snapshot_backend_selection() {
        let mut storage = StorageSettings::default();
        assert_eq!(storage.snapshot_backend(), SnapshotBackendConfig::InMemory);

        storage.snapshot_path = Some("/tmp/snapshots.redb".into());
        assert_eq!(
            storage.snapshot_backend(),
            SnapshotBackendConfig::redb("/tmp/snapshots.redb")
        );
    }

    #[test]
    fn test_sections_deserialize_with_defaults() {
        let cfg: ServerConfig =
            serde_json::from_str(r#"{"port": 9090, "cache": {"ttl_secs": 60}}"#).unwrap();
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.cache.ttl_secs, 60);
        assert_eq!(cfg.cache.default_limit, 10);
    }
}
