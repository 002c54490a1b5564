//! Cache metrics.
//!
//! Counters are recorded through the `metrics` facade. Without an installed
//! recorder they are no-ops, so library code can call the `track_*` helpers
//! unconditionally.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

pub use crate::logging::is_observability_enabled;

/// Install the Prometheus recorder and return a handle for rendering `/metrics`.
///
/// Returns `None` when observability is disabled or a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if !is_observability_enabled() {
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus metrics recorder installed");
            Some(handle)
        }
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

pub fn track_cache_hit(domain: &str) {
    counter!("cache_hits_total", "domain" => domain.to_string()).increment(1);
}

pub fn track_cache_miss(domain: &str) {
    counter!("cache_misses_total", "domain" => domain.to_string()).increment(1);
}

pub fn track_cache_error(operation: &'static str) {
    counter!("cache_errors_total", "operation" => operation).increment(1);
}

pub fn track_rate_limited(identity: &str) {
    counter!("cache_rate_limited_total", "identity" => identity.to_string()).increment(1);
}

pub fn track_invalidation(event: &'static str, removed: u64, failures: u64) {
    counter!("cache_invalidations_total", "event" => event).increment(1);
    counter!("cache_invalidated_keys_total", "event" => event).increment(removed);
    if failures > 0 {
        counter!("cache_invalidation_failures_total", "event" => event).increment(failures);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_without_recorder_is_noop() {
        track_cache_hit("leaderboard");
        track_cache_miss("contest");
        track_cache_error("get");
        track_rate_limited("profile");
        track_invalidation("vote_cast", 3, 0);
    }
}
