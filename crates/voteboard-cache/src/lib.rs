//! # Voteboard Cache
//!
//! Cache-aside layer for the voting platform's expensive aggregate reads
//! (leaderboards, contest listings, profile ranks, analytics rollups).
//!
//! This crate provides:
//! - Hierarchical cache key generation per entity domain
//! - Key validation and sanitisation, value size limits and at-rest encryption
//!   of sensitive-looking values
//! - Fixed-window rate limiting of cache operations
//! - Pluggable stores (in-memory and Redis) with tag-indexed invalidation
//! - Event-driven invalidation after committed writes
//! - A cache-aside wrapper that never changes an operation's outcome
//!
//! # Example
//!
//! ```ignore
//! use voteboard_cache::{CacheConfig, CacheOptions, CacheService, keys};
//!
//! let cache = CacheService::connect(
//!     CacheConfig::from_env(),
//!     &SecurityConfig::from_env(),
//!     &CacheRateLimitConfig::from_env(),
//! )
//! .await?;
//!
//! let board = cache
//!     .get_or_compute(
//!         &keys::leaderboard::main(1, 50),
//!         &CacheOptions::new().tags(keys::leaderboard::tags()),
//!         || repo.leaderboard(1, 50),
//!     )
//!     .await?;
//!
//! // After a vote commits:
//! cache.invalidate_vote(&contest_id, &profile_id).await;
//! ```

pub mod aside;
pub mod config;
pub mod entry;
pub mod error;
pub mod invalidation;
pub mod keys;
pub mod rate_limit;
pub mod security;
pub mod service;
pub mod store;

pub use aside::{CacheOptions, CachedOperation, with_cache};
pub use config::{CacheBackend, CacheConfig};
pub use entry::{CacheEntry, Tag};
pub use error::CacheError;
pub use invalidation::{
    CacheEvent, ContestChange, GlobalChange, InvalidationPlan, InvalidationReport, Invalidator,
    ProfileChange,
};
pub use keys::CacheKey;
pub use rate_limit::RateLimiter;
pub use security::{SecurityError, SecurityPolicy, sanitize_key};
pub use service::{CacheService, CacheStats, SetOptions};
pub use store::{CacheStore, MemoryStore, RedisStore};
