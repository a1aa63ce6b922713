use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics_exporter_prometheus::PrometheusHandle;
use subtle::ConstantTimeEq;

use crate::cache::MatchCache;
use crate::score::ScoreEngine;
use crate::server::config::ServerConfig;
use crate::server::error::ServerResult;
use crate::store::InMemoryProfileStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: API key -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, Instant)>>,

    /// Profiles served to the cache and written by the upsert routes
    pub profiles: Arc<InMemoryProfileStore>,

    /// The one match cache for this process
    pub cache: Arc<MatchCache>,

    /// Prometheus exposition, when a recorder was installed
    pub metrics: Option<PrometheusHandle>,

    started_at: Instant,
}

impl AppState {
    /// Build the profile store, durable tier and cache described by `config`.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let cache_config = config.cache_config()?;

        let profiles = match &config.storage.seed_path {
            Some(path) => Arc::new(InMemoryProfileStore::from_seed_file(path)?),
            None => Arc::new(InMemoryProfileStore::new()),
        };

        let snapshots = config.storage.snapshot_backend().build()?;

        let cache = Arc::new(MatchCache::new(
            profiles.clone(),
            snapshots,
            ScoreEngine::default(),
            cache_config,
        ));

        Ok(Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            profiles,
            cache,
            metrics: None,
            started_at: Instant::now(),
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Check if API key is valid.
    ///
    /// Every configured key is compared, in constant time per key.
    pub fn is_valid_api_key(&self, key: &str) -> bool {
        self.config
            .api_keys
            .iter()
            .fold(subtle::Choice::from(0), |found, candidate| {
                found | candidate.as_bytes().ct_eq(key.as_bytes())
            })
            .into()
    }

    /// Check rate limit for API key
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Page size for requests without an explicit `limit`.
    pub fn default_limit(&self) -> usize {
        self.config.cache.default_limit
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
}
