//! Rate limiting configuration for cache operations.
//!
//! Bounds how many cache operations a single caller identity may issue within
//! a fixed window, independently of the backing store.
//!
//! # Configuration
//!
//! - `CACHE_RATE_LIMIT_MAX_REQUESTS`: Operations allowed per window (default: 100)
//! - `CACHE_RATE_LIMIT_WINDOW_MS`: Window length in milliseconds (default: 60000)
//!
//! # Example
//!
//! ```ignore
//! use voteboard_config::CacheRateLimitConfig;
//!
//! let config = CacheRateLimitConfig::from_env();
//! let limiter = RateLimiter::new(config.max_requests, config.window());
//! ```

use std::time::Duration;

use crate::env::parse_or;

/// Default operations per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 100;

/// Default window length in milliseconds.
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

/// Rate limit configuration for cache operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheRateLimitConfig {
    /// Maximum operations per identifier within one window.
    pub max_requests: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl Default for CacheRateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_ms: DEFAULT_WINDOW_MS,
        }
    }
}

impl CacheRateLimitConfig {
    /// Creates a new `CacheRateLimitConfig` from environment variables.
    ///
    /// Falls back to default values if environment variables are not set
    /// or cannot be parsed.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_requests: parse_or("CACHE_RATE_LIMIT_MAX_REQUESTS", DEFAULT_MAX_REQUESTS),
            window_ms: parse_or("CACHE_RATE_LIMIT_WINDOW_MS", DEFAULT_WINDOW_MS),
        }
    }

    /// The window as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}
