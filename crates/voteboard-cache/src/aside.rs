//! Cache-aside composition.
//!
//! [`CacheService::get_or_compute`] reads a key and falls back to a
//! computation on a miss, storing the result. [`with_cache`] packages an
//! async operation, a key function and [`CacheOptions`] into a reusable
//! [`CachedOperation`].
//!
//! The cache never changes the outcome of the operation: every cache failure
//! degrades to running the operation, and operation errors are returned
//! untouched and never stored.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::entry::Tag;
use crate::error::CacheError;
use crate::keys::CacheKey;
use crate::service::{CacheService, SetOptions};

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// How a cache-aside read stores its result.
pub struct CacheOptions<T> {
    pub ttl: Option<Duration>,
    pub tags: Vec<Tag>,
    /// Decides whether a computed value is stored. Defaults to always.
    pub should_cache: Option<Predicate<T>>,
    /// Skip the cache entirely for this call site.
    pub bypass: bool,
    /// Store the computed value from a spawned task instead of before returning.
    pub detach_write: bool,
}

impl<T> CacheOptions<T> {
    pub fn new() -> Self {
        Self {
            ttl: None,
            tags: Vec::new(),
            should_cache: None,
            bypass: false,
            detach_write: false,
        }
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn should_cache(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.should_cache = Some(Arc::new(predicate));
        self
    }

    pub fn bypass(mut self, bypass: bool) -> Self {
        self.bypass = bypass;
        self
    }

    pub fn detach_write(mut self, detach: bool) -> Self {
        self.detach_write = detach;
        self
    }

    fn accepts(&self, value: &T) -> bool {
        self.should_cache.as_ref().is_none_or(|predicate| predicate(value))
    }

    fn set_options(&self) -> SetOptions {
        SetOptions {
            ttl: self.ttl,
            tags: self.tags.clone(),
        }
    }
}

impl<T> Default for CacheOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CacheOptions<T> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            tags: self.tags.clone(),
            should_cache: self.should_cache.clone(),
            bypass: self.bypass,
            detach_write: self.detach_write,
        }
    }
}

impl<T> fmt::Debug for CacheOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("ttl", &self.ttl)
            .field("tags", &self.tags)
            .field("should_cache", &self.should_cache.is_some())
            .field("bypass", &self.bypass)
            .field("detach_write", &self.detach_write)
            .finish()
    }
}

impl CacheService {
    /// Return the cached value for `key`, or run `compute` and cache its result.
    ///
    /// A hit never runs `compute`. A miss, a rejected key, a rate-limit
    /// denial, a store failure or a timeout all run `compute`; its `Ok` value
    /// is then stored unless `should_cache` refuses it or the call was rate
    /// limited. A failed write is logged and the computed value still returned.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        options: &CacheOptions<T>,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if options.bypass || !self.is_enabled() {
            return compute().await;
        }

        let mut store_result = true;
        match self.get::<T>(key).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(CacheError::RateLimited { identity }) => {
                debug!(
                    cache.key = %key,
                    cache.identity = %identity,
                    "Cache rate limited, computing uncached"
                );
                store_result = false;
            }
            Err(e @ CacheError::Validation(_)) => {
                warn!(cache.key = %key, error = %e, "Cache key rejected, computing uncached");
                store_result = false;
            }
            Err(e) => {
                warn!(cache.key = %key, error = %e, "Cache read failed, computing fresh");
            }
        }

        let value = compute().await?;

        if store_result && options.accepts(&value) {
            self.store_computed(key, &value, options).await;
        }

        Ok(value)
    }

    async fn store_computed<T: Serialize>(&self, key: &str, value: &T, options: &CacheOptions<T>) {
        if options.detach_write {
            let json = match serde_json::to_value(value) {
                Ok(json) => json,
                Err(e) => {
                    warn!(cache.key = %key, error = %e, "Failed to serialize computed value");
                    return;
                }
            };
            let cache = self.clone();
            let key = key.to_string();
            let set_options = options.set_options();

            tokio::spawn(async move {
                if let Err(e) = cache.set(&key, &json, set_options).await {
                    warn!(cache.key = %key, error = %e, "Failed to cache computed value");
                }
            });
            return;
        }

        if let Err(e) = self.set(key, value, options.set_options()).await {
            warn!(cache.key = %key, error = %e, "Failed to cache computed value");
        }
    }
}

/// An async operation wrapped with cache-aside behaviour. Built by [`with_cache`].
pub struct CachedOperation<A, T, F, K> {
    cache: CacheService,
    operation: F,
    key_of: K,
    options: CacheOptions<T>,
    _args: PhantomData<fn(A)>,
}

/// Wrap `operation` so each call first consults the cache under `key_of(&args)`.
///
/// # Example
///
/// ```ignore
/// let top = with_cache(
///     &cache,
///     |(page, limit)| repo.leaderboard(page, limit),
///     |&(page, limit)| keys::leaderboard::main(page, limit),
///     CacheOptions::new().ttl(ttl.leaderboard()).tags(keys::leaderboard::tags()),
/// );
/// let board = top.call((1, 50)).await?;
/// ```
pub fn with_cache<A, T, F, K>(
    cache: &CacheService,
    operation: F,
    key_of: K,
    options: CacheOptions<T>,
) -> CachedOperation<A, T, F, K>
where
    K: Fn(&A) -> CacheKey,
{
    CachedOperation {
        cache: cache.clone(),
        operation,
        key_of,
        options,
        _args: PhantomData,
    }
}

impl<A, T, F, K> CachedOperation<A, T, F, K>
where
    T: Serialize + DeserializeOwned,
    K: Fn(&A) -> CacheKey,
{
    pub async fn call<E, Fut>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = (self.key_of)(&args);
        self.cache
            .get_or_compute(&key, &self.options, || (self.operation)(args))
            .await
    }

    pub fn options(&self) -> &CacheOptions<T> {
        &self.options
    }
}
