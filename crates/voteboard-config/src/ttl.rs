//! Freshness windows per cached domain.
//!
//! # Environment Variables
//!
//! - `CACHE_TTL_LEADERBOARD_SECONDS` (default: 600)
//! - `CACHE_TTL_CONTEST_SECONDS` (default: 300)
//! - `CACHE_TTL_PARTICIPANTS_SECONDS` (default: 120)
//! - `CACHE_TTL_PROFILE_SECONDS` (default: 300)
//! - `CACHE_TTL_ANALYTICS_SECONDS` (default: 1800)

use std::time::Duration;

use crate::env::parse_or;

/// TTL for each family of cached aggregates, in seconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TtlConfig {
    pub leaderboard_seconds: u64,
    pub contest_seconds: u64,
    pub participants_seconds: u64,
    pub profile_seconds: u64,
    pub analytics_seconds: u64,
}

impl TtlConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            leaderboard_seconds: parse_or(
                "CACHE_TTL_LEADERBOARD_SECONDS",
                defaults.leaderboard_seconds,
            ),
            contest_seconds: parse_or("CACHE_TTL_CONTEST_SECONDS", defaults.contest_seconds),
            participants_seconds: parse_or(
                "CACHE_TTL_PARTICIPANTS_SECONDS",
                defaults.participants_seconds,
            ),
            profile_seconds: parse_or("CACHE_TTL_PROFILE_SECONDS", defaults.profile_seconds),
            analytics_seconds: parse_or(
                "CACHE_TTL_ANALYTICS_SECONDS",
                defaults.analytics_seconds,
            ),
        }
    }

    pub fn leaderboard(&self) -> Duration {
        Duration::from_secs(self.leaderboard_seconds)
    }

    pub fn contest(&self) -> Duration {
        Duration::from_secs(self.contest_seconds)
    }

    pub fn participants(&self) -> Duration {
        Duration::from_secs(self.participants_seconds)
    }

    pub fn profile(&self) -> Duration {
        Duration::from_secs(self.profile_seconds)
    }

    pub fn analytics(&self) -> Duration {
        Duration::from_secs(self.analytics_seconds)
    }
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            leaderboard_seconds: 600,
            contest_seconds: 300,
            participants_seconds: 120,
            profile_seconds: 300,
            analytics_seconds: 1800,
        }
    }
}
