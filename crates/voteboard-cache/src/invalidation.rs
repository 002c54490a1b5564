//! Event-driven cache invalidation.
//!
//! After a write commits, the caller describes what changed as a
//! [`CacheEvent`]. [`InvalidationPlan::for_event`] turns that into the tags,
//! keys and key patterns to purge, and [`Invalidator::apply`] purges them.
//!
//! Invalidation is best effort: failures are logged and counted in the
//! returned [`InvalidationReport`] but never propagated, so a committed write
//! is never reported as failed because the cache misbehaved. Entries that
//! survive a failed purge go stale until their TTL runs out.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{info, instrument, warn};
use voteboard_observability::track_invalidation;

use crate::entry::Tag;
use crate::keys::{CacheKey, contests, profiles, users};
use crate::service::CacheService;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} change '{value}'")]
pub struct UnknownChange {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! change_kind {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownChange;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownChange {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

change_kind! {
    /// What changed about a contest.
    ContestChange, "contest" {
        Participation => "participation",
        Vote => "vote",
        Update => "update",
    }
}

change_kind! {
    /// What changed about a profile.
    ProfileChange, "profile" {
        Rank => "rank",
        Stats => "stats",
    }
}

change_kind! {
    /// Platform-wide changes not scoped to one entity.
    GlobalChange, "global" {
        Vote => "vote",
        User => "user",
        Analytics => "analytics",
        All => "all",
    }
}

/// A committed data change that cached aggregates may depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    VoteCast {
        contest_id: String,
        profile_id: String,
    },
    Contest {
        contest_id: String,
        change: ContestChange,
    },
    Profile {
        profile_id: String,
        change: ProfileChange,
    },
    Global(GlobalChange),
}

impl CacheEvent {
    /// Metric label for the event.
    pub fn label(&self) -> &'static str {
        match self {
            CacheEvent::VoteCast { .. } => "vote_cast",
            CacheEvent::Contest { .. } => "contest",
            CacheEvent::Profile { .. } => "profile",
            CacheEvent::Global(_) => "global",
        }
    }
}

/// What to purge for one event. Tags first, then exact keys, then patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub tags: Vec<Tag>,
    pub keys: Vec<CacheKey>,
    pub patterns: Vec<String>,
}

impl InvalidationPlan {
    pub fn for_event(event: &CacheEvent) -> Self {
        match event {
            CacheEvent::VoteCast { profile_id, .. } => Self {
                tags: vec![Tag::Leaderboard, Tag::Contest, Tag::Vote],
                keys: vec![profiles::rank(profile_id)],
                patterns: vec![],
            },
            CacheEvent::Contest { contest_id, change } => match change {
                ContestChange::Participation => Self {
                    tags: vec![Tag::Contest, Tag::Leaderboard],
                    keys: vec![],
                    patterns: vec![contests::participants_pattern(contest_id)],
                },
                ContestChange::Vote => Self::tags([Tag::Leaderboard, Tag::Contest, Tag::Vote]),
                ContestChange::Update => Self {
                    tags: vec![Tag::Contest],
                    keys: vec![contests::by_id(contest_id)],
                    patterns: vec![],
                },
            },
            CacheEvent::Profile { profile_id, change } => match change {
                ProfileChange::Rank => Self {
                    tags: vec![Tag::Leaderboard],
                    keys: vec![profiles::rank(profile_id)],
                    patterns: vec![],
                },
                ProfileChange::Stats => Self {
                    tags: vec![],
                    keys: vec![],
                    patterns: vec![profiles::scope_pattern(profile_id)],
                },
            },
            CacheEvent::Global(change) => match change {
                GlobalChange::Vote => Self::tags([Tag::Leaderboard, Tag::Vote]),
                GlobalChange::User => Self {
                    tags: vec![Tag::User],
                    keys: vec![],
                    patterns: vec![users::invalidation_pattern()],
                },
                GlobalChange::Analytics => Self::tags([Tag::Analytics]),
                GlobalChange::All => Self::tags(Tag::ALL),
            },
        }
    }

    fn tags(tags: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            tags: tags.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.keys.is_empty() && self.patterns.is_empty()
    }
}

/// Outcome of applying a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    /// Entries removed across all steps.
    pub removed: u64,
    /// Steps that failed and were skipped.
    pub failures: u64,
}

impl InvalidationReport {
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// Applies invalidation plans against a cache service.
#[derive(Debug, Clone)]
pub struct Invalidator {
    cache: CacheService,
}

impl Invalidator {
    pub fn new(cache: CacheService) -> Self {
        Self { cache }
    }

    #[instrument(skip(self), fields(cache.operation = "INVALIDATE", cache.event = event.label()))]
    pub async fn apply(&self, event: &CacheEvent) -> InvalidationReport {
        let plan = InvalidationPlan::for_event(event);
        let mut report = InvalidationReport::default();

        for tag in &plan.tags {
            match self.cache.invalidate_by_tag(*tag).await {
                Ok(keys) => report.removed += keys.len() as u64,
                Err(e) => {
                    report.failures += 1;
                    warn!(error = %e, cache.tag = %tag, "Failed to invalidate tag");
                }
            }
        }

        if !plan.keys.is_empty() {
            match self.cache.del_many(&plan.keys).await {
                Ok(removed) => report.removed += removed,
                Err(e) => {
                    report.failures += 1;
                    warn!(error = %e, cache.keys = ?plan.keys, "Failed to invalidate keys");
                }
            }
        }

        for pattern in &plan.patterns {
            match self.cache.invalidate_pattern(pattern).await {
                Ok(removed) => report.removed += removed,
                Err(e) => {
                    report.failures += 1;
                    warn!(error = %e, cache.pattern = %pattern, "Failed to invalidate pattern");
                }
            }
        }

        track_invalidation(event.label(), report.removed, report.failures);
        info!(
            cache.removed = report.removed,
            cache.failures = report.failures,
            "Cache invalidation complete"
        );

        report
    }
}

impl CacheService {
    pub fn invalidator(&self) -> Invalidator {
        Invalidator::new(self.clone())
    }

    /// Invalidate caches affected by a change to one contest.
    ///
    /// Call this after the change has been committed.
    pub async fn invalidate_contest_cache(
        &self,
        contest_id: &str,
        change: ContestChange,
    ) -> InvalidationReport {
        self.invalidator()
            .apply(&CacheEvent::Contest {
                contest_id: contest_id.to_string(),
                change,
            })
            .await
    }

    /// Invalidate caches affected by a vote for `profile_id` in `contest_id`.
    pub async fn invalidate_vote(&self, contest_id: &str, profile_id: &str) -> InvalidationReport {
        self.invalidator()
            .apply(&CacheEvent::VoteCast {
                contest_id: contest_id.to_string(),
                profile_id: profile_id.to_string(),
            })
            .await
    }

    /// Invalidate caches scoped to one profile.
    pub async fn invalidate_profile_cache(
        &self,
        profile_id: &str,
        change: ProfileChange,
    ) -> InvalidationReport {
        self.invalidator()
            .apply(&CacheEvent::Profile {
                profile_id: profile_id.to_string(),
                change,
            })
            .await
    }

    pub async fn invalidate_global_cache(&self, change: GlobalChange) -> InvalidationReport {
        self.invalidator().apply(&CacheEvent::Global(change)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::config::CacheConfig;
    use crate::entry::CacheEntry;
    use crate::error::CacheError;
    use crate::keys::{ParticipantQuery, analytics, leaderboard};
    use crate::rate_limit::RateLimiter;
    use crate::security::SecurityPolicy;
    use crate::service::SetOptions;
    use crate::store::CacheStore;

    async fn seed(cache: &CacheService, key: &str, tags: &[Tag]) {
        cache
            .set(key, &key, SetOptions::new().tags(tags.iter().copied()))
            .await
            .unwrap();
    }

    async fn present(cache: &CacheService, key: &str) -> bool {
        cache.get::<String>(key).await.unwrap().is_some()
    }

    #[test]
    fn test_change_parsing() {
        assert_eq!("vote".parse::<ContestChange>().unwrap(), ContestChange::Vote);
        assert_eq!("Participation".parse::<ContestChange>().unwrap(), ContestChange::Participation);
        assert_eq!("stats".parse::<ProfileChange>().unwrap(), ProfileChange::Stats);
        assert_eq!("all".parse::<GlobalChange>().unwrap(), GlobalChange::All);

        let err = "rank".parse::<ContestChange>().unwrap_err();
        assert_eq!(err.to_string(), "unknown contest change 'rank'");
    }

    #[test]
    fn test_plans() {
        let plan = InvalidationPlan::for_event(&CacheEvent::VoteCast {
            contest_id: "c1".into(),
            profile_id: "p1".into(),
        });
        assert!(plan.tags.contains(&Tag::Leaderboard) && plan.tags.contains(&Tag::Contest));
        assert_eq!(plan.keys, vec!["profile:rank:p1".to_string()]);

        let plan = InvalidationPlan::for_event(&CacheEvent::Profile {
            profile_id: "p1".into(),
            change: ProfileChange::Stats,
        });
        assert!(plan.tags.is_empty());
        assert_eq!(plan.patterns, vec!["profile:*:p1".to_string()]);

        let plan = InvalidationPlan::for_event(&CacheEvent::Global(GlobalChange::User));
        assert_eq!(plan.tags, vec![Tag::User]);
        assert_eq!(plan.patterns, vec!["user:*".to_string()]);

        let plan = InvalidationPlan::for_event(&CacheEvent::Global(GlobalChange::All));
        assert_eq!(plan.tags.len(), Tag::ALL.len());
        assert!(!plan.is_empty());
    }

    #[tokio::test]
    async fn test_contest_vote_spares_unrelated_analytics() {
        let cache = CacheService::in_memory();
        let board = leaderboard::main(1, 50);
        let contest = contests::by_id("c1");
        let rollup = analytics::rollup("platform", "daily");

        seed(&cache, &board, &[Tag::Leaderboard]).await;
        seed(&cache, &contest, &[Tag::Contest]).await;
        seed(&cache, &rollup, &[Tag::Analytics]).await;

        let report = cache.invalidate_contest_cache("c1", ContestChange::Vote).await;
        assert!(report.is_clean());
        assert_eq!(report.removed, 2);

        assert!(!present(&cache, &board).await);
        assert!(!present(&cache, &contest).await);
        assert!(present(&cache, &rollup).await);
    }

    #[tokio::test]
    async fn test_global_vote_clears_leaderboard() {
        let cache = CacheService::in_memory();
        cache
            .set(
                "leaderboard:main:1:50",
                &serde_json::json!({"total": 10}),
                SetOptions::new()
                    .ttl(Duration::from_secs(600))
                    .tags([Tag::Leaderboard]),
            )
            .await
            .unwrap();

        let got: Option<serde_json::Value> = cache.get("leaderboard:main:1:50").await.unwrap();
        assert_eq!(got, Some(serde_json::json!({"total": 10})));

        cache.invalidate_global_cache(GlobalChange::Vote).await;

        let got: Option<serde_json::Value> = cache.get("leaderboard:main:1:50").await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_vote_cast_drops_rank_key() {
        let cache = CacheService::in_memory();
        let rank = profiles::rank("p1");
        let other_rank = profiles::rank("p2");
        seed(&cache, &rank, &profiles::tags()).await;
        seed(&cache, &other_rank, &profiles::tags()).await;

        cache.invalidate_vote("c1", "p1").await;

        assert!(!present(&cache, &rank).await);
        assert!(present(&cache, &other_rank).await);
    }

    #[tokio::test]
    async fn test_profile_stats_uses_scope_pattern() {
        let cache = CacheService::in_memory();
        for key in [profiles::rank("p1"), profiles::stats("p1"), profiles::stats("p10")] {
            seed(&cache, &key, &profiles::tags()).await;
        }

        let report = cache.invalidate_profile_cache("p1", ProfileChange::Stats).await;
        assert_eq!(report.removed, 2);
        assert!(present(&cache, &profiles::stats("p10")).await);
    }

    #[tokio::test]
    async fn test_global_user_clears_untagged_user_keys() {
        let cache = CacheService::in_memory();
        seed(&cache, "user:u1", &[]).await;
        seed(&cache, "user:u2", &[Tag::User]).await;

        let report = cache.invalidate_global_cache(GlobalChange::User).await;
        assert_eq!(report.removed, 2);
        assert!(!present(&cache, "user:u1").await);
    }

    #[tokio::test]
    async fn test_overlong_id_is_a_counted_failure() {
        let cache = CacheService::in_memory();
        let id = "c".repeat(300);
        let report = cache.invalidate_contest_cache(&id, ContestChange::Update).await;
        assert_eq!(report.failures, 1);
    }

    #[tokio::test]
    async fn test_participation_clears_untagged_listings() {
        let cache = CacheService::in_memory();
        let query = ParticipantQuery {
            page: Some(1),
            limit: Some(10),
            ..Default::default()
        };
        let listing = contests::participants("c1", &query);
        let other = contests::participants("c2", &query);
        seed(&cache, &listing, &[]).await;
        seed(&cache, &other, &[]).await;

        let report = cache
            .invalidate_contest_cache("c1", ContestChange::Participation)
            .await;

        assert!(report.is_clean());
        assert!(!present(&cache, &listing).await);
        assert!(present(&cache, &other).await);
    }

    #[derive(Debug)]
    struct DownStore;

    fn down() -> CacheError {
        redis::RedisError::from((redis::ErrorKind::IoError, "connection refused")).into()
    }

    #[async_trait]
    impl CacheStore for DownStore {
        fn backend(&self) -> &'static str {
            "down"
        }
        async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
            Err(down())
        }
        async fn set(
            &self,
            _key: &str,
            _entry: CacheEntry,
            _ttl: Duration,
        ) -> Result<(), CacheError> {
            Err(down())
        }
        async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
            Err(down())
        }
        async fn delete_many(&self, _keys: &[String]) -> Result<u64, CacheError> {
            Err(down())
        }
        async fn invalidate_by_tag(&self, _tag: Tag) -> Result<Vec<String>, CacheError> {
            Err(down())
        }
        async fn invalidate_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
            Err(down())
        }
        async fn len(&self) -> Result<u64, CacheError> {
            Err(down())
        }
        async fn ping(&self) -> Result<(), CacheError> {
            Err(down())
        }
    }

    #[tokio::test]
    async fn test_store_failures_are_reported_not_raised() {
        let cache = CacheService::new(
            Arc::new(DownStore),
            SecurityPolicy::default(),
            RateLimiter::default(),
            CacheConfig::default(),
        );

        let report = cache.invalidate_vote("c1", "p1").await;
        assert_eq!(report.removed, 0);
        assert_eq!(report.failures, 4);
    }
}
