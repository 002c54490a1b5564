//! In-process cache store.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::{CacheStore, glob_match};
use crate::entry::{CacheEntry, Tag};
use crate::error::CacheError;

#[derive(Debug, Clone)]
struct Slot {
    entry: CacheEntry,
    /// `None` when the TTL is too large to represent, i.e. never expires.
    deadline: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline.is_none_or(|deadline| now < deadline)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Slot>,
    tags: HashMap<Tag, HashSet<String>>,
}

impl Inner {
    fn remove(&mut self, key: &str) -> Option<Slot> {
        let slot = self.entries.remove(key)?;
        for tag in &slot.entry.tags {
            if let Some(keys) = self.tags.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tags.remove(tag);
                }
            }
        }
        Some(slot)
    }
}

/// Cache store kept in process memory.
///
/// Expired entries are logically absent immediately and physically removed on
/// the next read of their key or by [`MemoryStore::sweep`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Physically drop expired entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.write();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, slot)| !slot.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.remove(key);
        }
        expired.len()
    }

    /// Keys currently indexed under `tag`.
    pub fn tagged_keys(&self, tag: Tag) -> Vec<String> {
        let inner = self.inner.read();
        let mut keys: Vec<String> = inner
            .tags
            .get(&tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    #[instrument(skip(self), fields(cache.operation = "GET"))]
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let now = Instant::now();
        {
            let inner = self.inner.read();
            match inner.entries.get(key) {
                Some(slot) if slot.is_live(now) => return Ok(Some(slot.entry.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it so the tag index stays small.
        let mut inner = self.inner.write();
        if inner.entries.get(key).is_some_and(|slot| !slot.is_live(now)) {
            inner.remove(key);
            debug!(cache.key = %key, "Expired entry removed");
        }
        Ok(None)
    }

    #[instrument(skip(self, entry), fields(cache.operation = "SET"))]
    async fn set(&self, key: &str, entry: CacheEntry, ttl: Duration) -> Result<(), CacheError> {
        let deadline = Instant::now().checked_add(ttl);
        let mut inner = self.inner.write();

        inner.remove(key);
        for tag in &entry.tags {
            inner.tags.entry(*tag).or_default().insert(key.to_string());
        }
        inner
            .entries
            .insert(key.to_string(), Slot { entry, deadline });

        Ok(())
    }

    #[instrument(skip(self), fields(cache.operation = "DEL"))]
    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.inner.write().remove(key).is_some())
    }

    #[instrument(skip(self, keys), fields(cache.operation = "DEL_MANY", cache.count = keys.len()))]
    async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError> {
        let mut inner = self.inner.write();
        let removed = keys.iter().filter(|key| inner.remove(key).is_some()).count();
        Ok(removed as u64)
    }

    #[instrument(skip(self), fields(cache.operation = "TAG_DEL"))]
    async fn invalidate_by_tag(&self, tag: Tag) -> Result<Vec<String>, CacheError> {
        let mut inner = self.inner.write();
        let mut keys: Vec<String> = inner
            .tags
            .remove(&tag)
            .map(|keys| keys.into_iter().collect())
            .unwrap_or_default();
        keys.sort();

        for key in &keys {
            inner.remove(key);
        }

        debug!(cache.tag = %tag, cache.deleted = keys.len(), "Tag invalidation complete");
        Ok(keys)
    }

    #[instrument(skip(self), fields(cache.operation = "PATTERN_DEL"))]
    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut inner = self.inner.write();
        let matching: Vec<String> = inner
            .entries
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();

        for key in &matching {
            inner.remove(key);
        }

        debug!(
            cache.pattern = %pattern,
            cache.deleted = matching.len(),
            "Pattern invalidation complete"
        );
        Ok(matching.len() as u64)
    }

    async fn len(&self) -> Result<u64, CacheError> {
        let now = Instant::now();
        let inner = self.inner.read();
        Ok(inner.entries.values().filter(|slot| slot.is_live(now)).count() as u64)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        Ok(self.sweep() as u64)
    }
}
