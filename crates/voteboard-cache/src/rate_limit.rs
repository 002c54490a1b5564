//! Fixed-window rate limiting of cache operations.
//!
//! Each identifier (a caller, or a key domain such as `leaderboard`) owns a
//! counter and a reset deadline. The reset and the increment happen under one
//! lock, so concurrent calls for the same identifier never lose updates.
//!
//! State is in-memory and per process; nothing survives a restart.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use voteboard_config::CacheRateLimitConfig;

/// Counter for one identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u32,
    pub reset_at: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &CacheRateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window())
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record one operation for `id` and report whether it is allowed.
    ///
    /// A missing or elapsed window is reset to `count = 1` and allowed.
    /// Otherwise the call is denied once `count` has reached `max_requests`.
    pub fn is_allowed(&self, id: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock();

        let window = windows.entry(id.to_string()).or_insert(RateWindow {
            count: 0,
            reset_at: now,
        });

        if now >= window.reset_at {
            *window = RateWindow {
                count: 1,
                reset_at: now + self.window,
            };
            return true;
        }

        if window.count >= self.max_requests {
            return false;
        }

        window.count += 1;
        true
    }

    /// Operations left in the current window for `id`.
    pub fn remaining(&self, id: &str) -> u32 {
        let now = Instant::now();
        match self.windows.lock().get(id) {
            Some(window) if now < window.reset_at => {
                self.max_requests.saturating_sub(window.count)
            }
            _ => self.max_requests,
        }
    }

    /// Time until the window of `id` resets, `None` when no window is active.
    pub fn resets_in(&self, id: &str) -> Option<Duration> {
        let now = Instant::now();
        self.windows
            .lock()
            .get(id)
            .filter(|window| now < window.reset_at)
            .map(|window| window.reset_at - now)
    }

    /// Forget the window of `id`.
    pub fn reset(&self, id: &str) {
        self.windows.lock().remove(id);
    }

    /// Drop every elapsed window. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, window| now < window.reset_at);
        before - windows.len()
    }

    /// Number of identifiers currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.lock().len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&CacheRateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_window_allows_then_denies() {
        let limiter = RateLimiter::new(3, Duration::from_millis(1000));

        let results: Vec<bool> = (0..4).map(|_| limiter.is_allowed("x")).collect();
        assert_eq!(results, vec![true, true, true, false]);

        tokio::time::advance(Duration::from_millis(1001)).await;
        assert!(limiter.is_allowed("x"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_requests() {
        let limiter = RateLimiter::new(3, Duration::from_secs(1));
        assert_eq!(limiter.remaining("x"), 3);

        limiter.is_allowed("x");
        assert_eq!(limiter.remaining("x"), 2);

        for _ in 0..5 {
            limiter.is_allowed("x");
        }
        assert_eq!(limiter.remaining("x"), 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(limiter.remaining("x"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identifiers_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.is_allowed("a"));
        assert!(!limiter.is_allowed("a"));
        assert!(limiter.is_allowed("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_and_purge() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        limiter.is_allowed("a");
        limiter.is_allowed("b");
        assert_eq!(limiter.tracked(), 2);
        assert!(limiter.resets_in("a").is_some());

        limiter.reset("a");
        assert!(limiter.is_allowed("a"));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(limiter.purge_expired(), 2);
        assert_eq!(limiter.tracked(), 0);
        assert!(limiter.resets_in("a").is_none());
    }

    #[test]
    fn test_default_limits() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.max_requests(), 100);
        assert_eq!(limiter.window(), Duration::from_secs(60));
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let limiter = Arc::new(RateLimiter::new(1000, Duration::from_secs(3600)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    (0..100).filter(|_| limiter.is_allowed("shared")).count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 800);
        assert_eq!(limiter.remaining("shared"), 200);
    }
}
