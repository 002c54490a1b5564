//! The cache service handed to application code.
//!
//! [`CacheService`] puts key validation, rate limiting, value screening,
//! encryption and a per-operation timeout in front of a [`CacheStore`].
//! It is constructed once at startup and cloned into whatever needs it.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use voteboard_config::{CacheRateLimitConfig, SecurityConfig};
use voteboard_observability::{
    track_cache_error, track_cache_hit, track_cache_miss, track_rate_limited,
};

use crate::config::{CacheBackend, CacheConfig};
use crate::entry::{CacheEntry, Tag};
use crate::error::CacheError;
use crate::keys::domain_of;
use crate::rate_limit::RateLimiter;
use crate::security::SecurityPolicy;
use crate::store::{CacheStore, MemoryStore, RedisStore};

/// Per-write options for [`CacheService::set`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Falls back to `CacheConfig::default_ttl_seconds` when unset.
    pub ttl: Option<Duration>,
    pub tags: Vec<Tag>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    errors: AtomicU64,
    rate_limited: AtomicU64,
}

/// Point-in-time copy of the service counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub errors: u64,
    pub rate_limited: u64,
}

impl CacheStats {
    /// Fraction of reads served from the cache, `0.0` before any read.
    pub fn hit_ratio(&self) -> f64 {
        let reads = self.hits + self.misses;
        if reads == 0 {
            0.0
        } else {
            self.hits as f64 / reads as f64
        }
    }
}

#[derive(Debug)]
struct Inner {
    store: Arc<dyn CacheStore>,
    security: SecurityPolicy,
    limiter: RateLimiter,
    config: CacheConfig,
    counters: Counters,
}

/// Shared handle to the cache. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CacheService {
    inner: Arc<Inner>,
}

impl CacheService {
    pub fn new(
        store: Arc<dyn CacheStore>,
        security: SecurityPolicy,
        limiter: RateLimiter,
        config: CacheConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                security,
                limiter,
                config,
                counters: Counters::default(),
            }),
        }
    }

    /// In-memory service with default policy and limits.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            SecurityPolicy::default(),
            RateLimiter::default(),
            CacheConfig::default(),
        )
    }

    /// Build the service with the store selected by `config.backend`.
    ///
    /// # Errors
    ///
    /// - `Validation` / `Encryption` if the security configuration does not compile
    /// - `Connection` if Redis is selected and unreachable
    pub async fn connect(
        config: CacheConfig,
        security: &SecurityConfig,
        rate_limit: &CacheRateLimitConfig,
    ) -> Result<Self, CacheError> {
        let policy = SecurityPolicy::new(security)?;
        let store: Arc<dyn CacheStore> = match config.backend {
            CacheBackend::Memory => Arc::new(MemoryStore::new()),
            CacheBackend::Redis => {
                Arc::new(RedisStore::new(&config.redis_url, config.key_prefix.clone()).await?)
            }
        };

        info!(
            cache.backend = store.backend(),
            cache.enabled = config.enabled,
            "Cache service initialized"
        );

        Ok(Self::new(
            store,
            policy,
            RateLimiter::from_config(rate_limit),
            config,
        ))
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.config.enabled
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.inner.store
    }

    pub fn security(&self) -> &SecurityPolicy {
        &self.inner.security
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    pub fn stats(&self) -> CacheStats {
        let c = &self.inner.counters;
        CacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            writes: c.writes.load(Ordering::Relaxed),
            errors: c.errors.load(Ordering::Relaxed),
            rate_limited: c.rate_limited.load(Ordering::Relaxed),
        }
    }

    /// Validate the key, then charge one operation to its domain.
    fn admit(&self, key: &str) -> Result<(), CacheError> {
        self.inner.security.validate_key(key)?;

        let identity = domain_of(key);
        if !self.inner.limiter.is_allowed(identity) {
            self.inner.counters.rate_limited.fetch_add(1, Ordering::Relaxed);
            track_rate_limited(identity);
            return Err(CacheError::RateLimited {
                identity: identity.to_string(),
            });
        }
        Ok(())
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        let timeout = self.inner.config.op_timeout();
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                operation,
                timeout_ms: self.inner.config.op_timeout_ms,
            }),
        }
    }

    fn record_error(&self, operation: &'static str, err: &CacheError) {
        self.inner.counters.errors.fetch_add(1, Ordering::Relaxed);
        track_cache_error(operation);
        if err.is_transient() {
            error!(error = %err, cache.operation = operation, "Cache store failure");
        }
    }

    /// Read and decode a cached value.
    ///
    /// Missing and expired keys are `Ok(None)`. Encrypted entries are
    /// decrypted transparently.
    #[instrument(skip(self), fields(cache.operation = "GET"))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        self.admit(key)?;

        let domain = domain_of(key);
        let entry = match self.bounded("get", self.inner.store.get(key)).await {
            Ok(entry) => entry,
            Err(e) => {
                self.record_error("get", &e);
                return Err(e);
            }
        };

        let Some(entry) = entry else {
            self.inner.counters.misses.fetch_add(1, Ordering::Relaxed);
            track_cache_miss(domain);
            debug!(cache.key = %key, "Cache miss");
            return Ok(None);
        };

        let decoded = self.decode(entry);
        match decoded {
            Ok(value) => {
                self.inner.counters.hits.fetch_add(1, Ordering::Relaxed);
                track_cache_hit(domain);
                debug!(cache.key = %key, "Cache hit");
                Ok(Some(value))
            }
            Err(e) => {
                self.record_error("decode", &e);
                warn!(cache.key = %key, error = %e, "Cached entry could not be decoded");
                Err(e)
            }
        }
    }

    fn decode<T: DeserializeOwned>(&self, entry: CacheEntry) -> Result<T, CacheError> {
        if !entry.encrypted {
            return Ok(serde_json::from_value(entry.value)?);
        }

        let serde_json::Value::String(envelope) = entry.value else {
            return Err(crate::security::SecurityError::MalformedEnvelope("not a string").into());
        };
        let plaintext = self.inner.security.decrypt(&envelope)?;
        Ok(serde_json::from_str(&plaintext)?)
    }

    /// Validate, optionally encrypt and store a value.
    ///
    /// Values matching a sensitive pattern are encrypted when encryption is
    /// enabled and otherwise stored as-is with a warning.
    #[instrument(skip(self, value, options), fields(cache.operation = "SET"))]
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<(), CacheError> {
        self.admit(key)?;

        let json = serde_json::to_value(value)?;
        let check = self.inner.security.validate_value(&json)?;
        let ttl = options.ttl.unwrap_or_else(|| self.inner.config.default_ttl());

        let mut entry = CacheEntry::new(json, options.tags, ttl).sensitive(check.is_sensitive);
        if self.inner.security.should_encrypt(&check) {
            entry = entry.encrypted(self.inner.security.encrypt(&check.serialized)?);
        } else if check.is_sensitive {
            warn!(cache.key = %key, "Caching sensitive-looking value without encryption");
        }

        if let Err(e) = self.bounded("set", self.inner.store.set(key, entry, ttl)).await {
            self.record_error("set", &e);
            return Err(e);
        }

        self.inner.counters.writes.fetch_add(1, Ordering::Relaxed);
        debug!(
            cache.key = %key,
            cache.ttl_secs = ttl.as_secs(),
            cache.bytes = check.size,
            "Cache set"
        );
        Ok(())
    }

    /// Remove one key. Deletes are not rate limited, so invalidation is never refused.
    #[instrument(skip(self), fields(cache.operation = "DEL"))]
    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.inner.security.validate_key(key)?;
        self.inner.store.delete(key).await.inspect_err(|e| self.record_error("delete", e))
    }

    /// Remove several keys. Every key is validated before anything is removed.
    #[instrument(skip(self, keys), fields(cache.operation = "DEL_MANY", cache.count = keys.len()))]
    pub async fn del_many(&self, keys: &[String]) -> Result<u64, CacheError> {
        for key in keys {
            self.inner.security.validate_key(key)?;
        }
        if keys.is_empty() {
            return Ok(0);
        }
        self.inner
            .store
            .delete_many(keys)
            .await
            .inspect_err(|e| self.record_error("delete_many", e))
    }

    #[instrument(skip(self), fields(cache.operation = "TAG_DEL"))]
    pub async fn invalidate_by_tag(&self, tag: Tag) -> Result<Vec<String>, CacheError> {
        self.inner
            .store
            .invalidate_by_tag(tag)
            .await
            .inspect_err(|e| self.record_error("invalidate_tag", e))
    }

    /// Remove every key matching `pattern`, where `*` matches any run of characters.
    #[instrument(skip(self), fields(cache.operation = "PATTERN_DEL"))]
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        // Patterns carry `*`, so only the structural key checks apply.
        let literal = pattern.replace('*', "x");
        self.inner.security.validate_key(&literal)?;

        self.inner
            .store
            .invalidate_pattern(pattern)
            .await
            .inspect_err(|e| self.record_error("invalidate_pattern", e))
    }

    /// Backend reachability plus entry count.
    pub async fn health(&self) -> Result<u64, CacheError> {
        self.inner.store.ping().await?;
        self.inner.store.len().await
    }

    /// Periodically drop elapsed rate-limit windows and expired entries.
    pub fn spawn_maintenance(&self, every: Duration) -> JoinHandle<()> {
        let cache = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;

                let windows = cache.inner.limiter.purge_expired();
                match cache.inner.store.purge_expired().await {
                    Ok(entries) => {
                        debug!(
                            cache.windows = windows,
                            cache.entries = entries,
                            "Cache maintenance run"
                        )
                    }
                    Err(e) => warn!(error = %e, "Cache maintenance failed"),
                }
            }
        })
    }
}
