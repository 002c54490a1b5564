//! Redis cache store for caches shared between instances.
//!
//! Layout, for prefix `voteboard`:
//!
//! - `voteboard:<key>` holds the JSON-encoded [`CacheEntry`] with a native `EX` expiry
//! - `voteboard#tag:<TAG>` is a set of the data keys tagged `<TAG>`
//!
//! `#` never passes key validation, so tag index keys cannot collide with data keys.
//! Tag sets may retain members whose entries have expired or been overwritten
//! with other tags; the only effect is that invalidating such a tag also removes
//! the newer entry.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, error, instrument};

use super::CacheStore;
use crate::entry::{CacheEntry, Tag};
use crate::error::CacheError;

const SCAN_BATCH: usize = 100;

/// Redis cache store with a managed, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects to Redis.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `prefix` - Namespace for every key this store writes
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` if connection fails.
    pub async fn new(redis_url: &str, prefix: impl Into<String>) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self {
            conn,
            prefix: prefix.into(),
        })
    }

    fn data_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    fn tag_key(&self, tag: Tag) -> String {
        format!("{}#tag:{}", self.prefix, tag)
    }

    fn strip_prefix<'a>(&self, data_key: &'a str) -> &'a str {
        data_key
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(data_key)
    }

    /// Remove data keys and their memberships in every tag set.
    async fn remove_data_keys(&self, data_keys: &[String]) -> Result<u64, CacheError> {
        if data_keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic().del(data_keys);
        for tag in Tag::ALL {
            pipe.srem(self.tag_key(tag), data_keys).ignore();
        }

        let (removed,): (u64,) = pipe.query_async(&mut conn).await?;
        Ok(removed)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut found = Vec::new();

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            found.extend(keys);

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    #[instrument(skip(self), fields(cache.operation = "GET"))]
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let mut conn = self.conn.clone();

        let Some(raw) = conn.get::<_, Option<String>>(self.data_key(key)).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if entry.is_expired() => Ok(None),
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                error!(cache.key = %key, error = %e, "Failed to deserialize cached entry");
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self, entry), fields(cache.operation = "SETEX"))]
    async fn set(&self, key: &str, entry: CacheEntry, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let data_key = self.data_key(key);
        let json = serde_json::to_string(&entry)?;
        // Redis rejects EX 0.
        let secs = ttl.as_secs().max(1);

        let mut pipe = redis::pipe();
        pipe.atomic().set_ex(&data_key, json, secs).ignore();
        for tag in &entry.tags {
            pipe.sadd(self.tag_key(*tag), &data_key).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;

        debug!(cache.key = %key, cache.ttl_secs = %secs, "Cache set");

        Ok(())
    }

    #[instrument(skip(self), fields(cache.operation = "DEL"))]
    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self.remove_data_keys(&[self.data_key(key)]).await?;
        Ok(removed > 0)
    }

    #[instrument(skip(self, keys), fields(cache.operation = "DEL_MANY", cache.count = keys.len()))]
    async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError> {
        let data_keys: Vec<String> = keys.iter().map(|key| self.data_key(key)).collect();
        self.remove_data_keys(&data_keys).await
    }

    #[instrument(skip(self), fields(cache.operation = "TAG_DEL"))]
    async fn invalidate_by_tag(&self, tag: Tag) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        let tag_key = self.tag_key(tag);

        let members: Vec<String> = conn.smembers(&tag_key).await?;
        self.remove_data_keys(&members).await?;
        conn.del::<_, ()>(&tag_key).await?;

        let mut keys: Vec<String> = members
            .iter()
            .map(|member| self.strip_prefix(member).to_string())
            .collect();
        keys.sort();

        debug!(cache.tag = %tag, cache.deleted = keys.len(), "Tag invalidation complete");

        Ok(keys)
    }

    /// Invalidates all keys matching a pattern.
    ///
    /// # Warning
    ///
    /// Uses SCAN which is safe for production, but may be slow with many keys.
    #[instrument(skip(self), fields(cache.operation = "SCAN_DEL"))]
    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let matching = self.scan(&self.data_key(pattern)).await?;

        let mut deleted = 0;
        for batch in matching.chunks(SCAN_BATCH) {
            deleted += self.remove_data_keys(batch).await?;
        }

        debug!(cache.pattern = %pattern, cache.deleted = %deleted, "Pattern invalidation complete");

        Ok(deleted)
    }

    async fn len(&self) -> Result<u64, CacheError> {
        let keys = self.scan(&self.data_key("*")).await?;
        Ok(keys.len() as u64)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
