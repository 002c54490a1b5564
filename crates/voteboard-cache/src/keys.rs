//! Cache key generation.
//!
//! Keys are namespaced as `<domain>:<entity-id-or-wildcard>:<discriminators>`.
//! Generation is pure: the same logical request always yields the same key.
//!
//! Parameters are never reordered. Each entity module documents its parameter
//! order and callers must pass parameters in that order. Absent optional
//! parameters are omitted from the key, so callers normalise "absent" versus
//! "explicit default" before building a key.

use std::fmt::{self, Write};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::entry::Tag;

/// A canonical cache key.
pub type CacheKey = String;

/// Fluent key construction.
///
/// ```ignore
/// let key = KeyBuilder::new("leaderboard").part("main").part(1).part(50).build();
/// assert_eq!(key, "leaderboard:main:1:50");
/// ```
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    key: String,
}

impl KeyBuilder {
    pub fn new(domain: &str) -> Self {
        Self {
            key: domain.to_string(),
        }
    }

    pub fn part(mut self, part: impl fmt::Display) -> Self {
        // Writing into a String cannot fail.
        let _ = write!(self.key, ":{}", part);
        self
    }

    /// Append the part only when present.
    pub fn opt<T: fmt::Display>(self, part: Option<T>) -> Self {
        match part {
            Some(part) => self.part(part),
            None => self,
        }
    }

    pub fn build(self) -> CacheKey {
        self.key
    }
}

/// Map a domain and ordered parameters to a key, skipping absent parameters.
pub fn generate_key(domain: &str, params: &[Option<&dyn fmt::Display>]) -> CacheKey {
    params
        .iter()
        .fold(KeyBuilder::new(domain), |builder, param| builder.opt(*param))
        .build()
}

/// Hex digest of the first 8 bytes of SHA-256 over `bytes`.
fn short_digest(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    hex::encode(&hash[..8])
}

/// Stable digest of arbitrary filter parameters.
///
/// Unlike `std`'s `DefaultHasher`, the result is identical across processes,
/// which matters once several instances share one Redis.
pub fn hash_filters<T: Serialize>(filters: &T) -> String {
    // Serializing plain filter structs does not fail; a failure hashes as empty input.
    let bytes = serde_json::to_vec(filters).unwrap_or_default();
    short_digest(&bytes)
}

/// Make a free-text discriminator safe to embed in a key.
///
/// Text made only of `[A-Za-z0-9_-]` is kept verbatim; anything else becomes
/// `h` followed by a stable digest, so user input can never inject `:` or
/// traversal sequences into the key space.
pub fn text_segment(text: &str) -> String {
    let plain = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if plain {
        text.to_string()
    } else {
        format!("h{}", short_digest(text.as_bytes()))
    }
}

/// Entity id as a key segment. Ids that could collide with key structure
/// (`:`, `*`, whitespace) are replaced by their digest, as in [`text_segment`].
pub fn id_segment(id: impl fmt::Display) -> String {
    text_segment(&id.to_string())
}

/// Cache keys for leaderboards.
pub mod leaderboard {
    use super::*;

    pub const DOMAIN: &str = "leaderboard";

    /// Global leaderboard page. Parameter order: page, limit.
    pub fn main(page: u32, limit: u32) -> CacheKey {
        KeyBuilder::new(DOMAIN).part("main").part(page).part(limit).build()
    }

    /// Leaderboard of one contest. Parameter order: contest, page, limit.
    pub fn contest(contest_id: impl fmt::Display, page: u32, limit: u32) -> CacheKey {
        KeyBuilder::new(DOMAIN)
            .part("contest")
            .part(id_segment(contest_id))
            .part(page)
            .part(limit)
            .build()
    }

    pub fn tags() -> Vec<Tag> {
        vec![Tag::Leaderboard]
    }

    pub fn contest_tags() -> Vec<Tag> {
        vec![Tag::Leaderboard, Tag::Contest]
    }
}

/// Participant listing filters, in key order: page, limit, search, status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParticipantQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub status: Option<String>,
}

/// Cache keys for contest data.
pub mod contests {
    use super::*;

    pub const DOMAIN: &str = "contest";

    /// Key for a single contest by ID.
    pub fn by_id(contest_id: impl fmt::Display) -> CacheKey {
        KeyBuilder::new(DOMAIN).part(id_segment(contest_id)).build()
    }

    /// Key for a contest list with filters hash.
    pub fn list(filters_hash: &str) -> CacheKey {
        KeyBuilder::new(DOMAIN).part("list").part(filters_hash).build()
    }

    /// `contest:participants:<contestId>[:<page>][:<limit>][:<search>][:<status>]`
    pub fn participants(contest_id: impl fmt::Display, query: &ParticipantQuery) -> CacheKey {
        KeyBuilder::new(DOMAIN)
            .part("participants")
            .part(id_segment(contest_id))
            .opt(query.page)
            .opt(query.limit)
            .opt(query.search.as_deref().map(text_segment))
            .opt(query.status.as_deref().map(text_segment))
            .build()
    }

    /// Pattern matching every participant listing of one contest.
    pub fn participants_pattern(contest_id: impl fmt::Display) -> String {
        format!("{}:participants:{}*", DOMAIN, id_segment(contest_id))
    }

    pub fn tags() -> Vec<Tag> {
        vec![Tag::Contest]
    }
}

/// Cache keys for profiles. All profile keys are `profile:<kind>:<profileId>`.
pub mod profiles {
    use super::*;

    pub const DOMAIN: &str = "profile";

    pub fn by_id(profile_id: impl fmt::Display) -> CacheKey {
        KeyBuilder::new(DOMAIN).part("details").part(id_segment(profile_id)).build()
    }

    /// Key for a profile's rank.
    pub fn rank(profile_id: impl fmt::Display) -> CacheKey {
        KeyBuilder::new(DOMAIN).part("rank").part(id_segment(profile_id)).build()
    }

    /// Key for a profile's voting statistics.
    pub fn stats(profile_id: impl fmt::Display) -> CacheKey {
        KeyBuilder::new(DOMAIN).part("stats").part(id_segment(profile_id)).build()
    }

    /// Pattern matching every key scoped to one profile.
    pub fn scope_pattern(profile_id: impl fmt::Display) -> String {
        format!("{}:*:{}", DOMAIN, id_segment(profile_id))
    }

    pub fn tags() -> Vec<Tag> {
        vec![Tag::Profile]
    }

    pub fn rank_tags() -> Vec<Tag> {
        vec![Tag::Profile, Tag::Leaderboard]
    }
}

/// Cache keys for analytics rollups.
pub mod analytics {
    use super::*;

    pub const DOMAIN: &str = "analytics";

    /// Parameter order: scope, period.
    pub fn rollup(scope: &str, period: &str) -> CacheKey {
        KeyBuilder::new(DOMAIN)
            .part(text_segment(scope))
            .part(text_segment(period))
            .build()
    }

    pub fn tags() -> Vec<Tag> {
        vec![Tag::Analytics]
    }
}

/// Cache keys for vote tallies.
pub mod votes {
    use super::*;

    pub const DOMAIN: &str = "vote";

    pub fn tally(contest_id: impl fmt::Display) -> CacheKey {
        KeyBuilder::new(DOMAIN).part("tally").part(id_segment(contest_id)).build()
    }

    pub fn tags() -> Vec<Tag> {
        vec![Tag::Vote, Tag::Contest]
    }
}

/// Cache keys for user-related data.
pub mod users {
    use super::*;

    pub const DOMAIN: &str = "user";

    pub fn by_id(user_id: impl fmt::Display) -> CacheKey {
        KeyBuilder::new(DOMAIN).part(id_segment(user_id)).build()
    }

    /// Pattern to invalidate all user-related keys.
    pub fn invalidation_pattern() -> String {
        format!("{}:*", DOMAIN)
    }

    pub fn tags() -> Vec<Tag> {
        vec![Tag::User]
    }
}

/// First segment of a key, used as its metrics and rate-limit domain.
pub fn domain_of(key: &str) -> &str {
    key.split(':').next().unwrap_or(key)
}
