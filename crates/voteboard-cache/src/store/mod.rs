//! Cache store adapters.
//!
//! A [`CacheStore`] is the primitive key-value layer under the cache service:
//! get/set/delete plus tag-indexed and pattern-based bulk removal. Stores are
//! shared across tasks, so implementations are `Send + Sync` and must never
//! hold a lock across an `.await`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::entry::{CacheEntry, Tag};
use crate::error::CacheError;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Cache backend trait for pluggable store implementations.
///
/// Every operation is idempotent apart from expiry timing: repeating a `set`
/// overwrites, repeating a `delete` is a no-op.
#[async_trait]
pub trait CacheStore: Send + Sync + fmt::Debug {
    /// Short backend name for logs (`memory`, `redis`).
    fn backend(&self) -> &'static str;

    /// Fetch a live entry. Missing and expired keys are `Ok(None)`, not errors.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Store an entry for `ttl`, replacing any entry at `key` and indexing it under its tags.
    async fn set(&self, key: &str, entry: CacheEntry, ttl: Duration) -> Result<(), CacheError>;

    /// Remove one entry and its tag references. Returns whether an entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove several entries. Returns how many existed.
    async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError>;

    /// Remove every entry currently tagged with `tag`. Returns the removed keys.
    async fn invalidate_by_tag(&self, tag: Tag) -> Result<Vec<String>, CacheError>;

    /// Remove every key matching a glob pattern (`*` matches any run of characters).
    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, CacheError>;

    /// Number of entries held.
    async fn len(&self) -> Result<u64, CacheError>;

    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Physically drop expired entries. Stores with native expiry need not override this.
    async fn purge_expired(&self) -> Result<u64, CacheError> {
        Ok(0)
    }
}

/// Glob match where `*` matches any (possibly empty) run of characters and
/// every other character matches itself.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
