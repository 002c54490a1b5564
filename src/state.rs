use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::{error, info, warn};
use voteboard_cache::{
    CacheBackend, CacheConfig, CacheService, CacheStore, MemoryStore, RateLimiter, RedisStore,
    SecurityPolicy,
};
use voteboard_config::{CacheRateLimitConfig, SecurityConfig, TtlConfig};

use crate::repository::VotingRepository;

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn VotingRepository>,
    pub cache: CacheService,
    pub ttl: TtlConfig,
    maintenance: Option<AbortHandle>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("cache", &self.cache)
            .field("ttl", &self.ttl)
            .field("maintenance", &self.maintenance.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(repo: Arc<dyn VotingRepository>, cache: CacheService, ttl: TtlConfig) -> Self {
        Self {
            repo,
            cache,
            ttl,
            maintenance: None,
        }
    }

    /// Stop the background cache maintenance task, if one was started.
    pub fn shutdown(&self) {
        if let Some(handle) = &self.maintenance {
            handle.abort();
            info!("Cache maintenance stopped");
        }
    }

    /// Whether the background maintenance task is still running.
    pub fn maintenance_running(&self) -> bool {
        self.maintenance
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

/// Build the application state from the environment.
///
/// The cache never prevents startup: an unreachable Redis falls back to the
/// in-memory store, and an invalid security configuration disables caching.
pub async fn init_app_state(repo: Arc<dyn VotingRepository>) -> AppState {
    let mut config = CacheConfig::from_env();
    let rate_limit = CacheRateLimitConfig::from_env();

    let security = match SecurityPolicy::new(&SecurityConfig::from_env()) {
        Ok(policy) => policy,
        Err(e) => {
            error!(error = %e, "Invalid cache security configuration, caching disabled");
            config.enabled = false;
            SecurityPolicy::default()
        }
    };

    let store = init_store(&config).await;
    let cache = CacheService::new(
        store,
        security,
        RateLimiter::from_config(&rate_limit),
        config,
    );
    let maintenance = cache.spawn_maintenance(MAINTENANCE_INTERVAL).abort_handle();

    info!(
        cache.backend = cache.store().backend(),
        cache.enabled = cache.is_enabled(),
        "Application state initialized"
    );

    AppState {
        maintenance: Some(maintenance),
        ..AppState::new(repo, cache, TtlConfig::from_env())
    }
}

async fn init_store(config: &CacheConfig) -> Arc<dyn CacheStore> {
    match config.backend {
        CacheBackend::Memory => Arc::new(MemoryStore::new()),
        CacheBackend::Redis => {
            match RedisStore::new(&config.redis_url, config.key_prefix.clone()).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!(error = %e, "Redis unavailable, falling back to in-memory cache");
                    Arc::new(MemoryStore::new())
                }
            }
        }
    }
}
