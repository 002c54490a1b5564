//! Cached entries and the tags that group them.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Coarse label grouping cache keys for bulk invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tag {
    Contest,
    Leaderboard,
    Profile,
    Analytics,
    Vote,
    User,
}

impl Tag {
    pub const ALL: [Tag; 6] = [
        Tag::Contest,
        Tag::Leaderboard,
        Tag::Profile,
        Tag::Analytics,
        Tag::Vote,
        Tag::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Contest => "CONTEST",
            Tag::Leaderboard => "LEADERBOARD",
            Tag::Profile => "PROFILE",
            Tag::Analytics => "ANALYTICS",
            Tag::Vote => "VOTE",
            Tag::User => "USER",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cache tag: {0}")]
pub struct UnknownTag(pub String);

impl FromStr for Tag {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTag(s.to_string()))
    }
}

/// A value as held by a cache store.
///
/// Entries are never edited in place: a new `set` replaces the entry and
/// invalidation removes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached JSON value, or the cipher envelope string when `encrypted` is set.
    pub value: serde_json::Value,
    pub tags: BTreeSet<Tag>,
    pub stored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub sensitive: bool,
    #[serde(default)]
    pub encrypted: bool,
}

impl CacheEntry {
    /// Build an entry stored now and expiring after `ttl`.
    pub fn new(
        value: serde_json::Value,
        tags: impl IntoIterator<Item = Tag>,
        ttl: Duration,
    ) -> Self {
        let stored_at = Utc::now();
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| stored_at.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            value,
            tags: tags.into_iter().collect(),
            stored_at,
            expires_at,
            sensitive: false,
            encrypted: false,
        }
    }

    pub fn sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }

    /// Replace the value with a cipher envelope.
    pub fn encrypted(mut self, envelope: String) -> Self {
        self.value = serde_json::Value::String(envelope);
        self.encrypted = true;
        self
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, `None` once expired.
    pub fn remaining_ttl(&self) -> Option<Duration> {
        (self.expires_at - Utc::now()).to_std().ok().filter(|d| !d.is_zero())
    }
}
