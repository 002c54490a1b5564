//! Voteboard Observability Module
//!
//! Provides configurable observability features including:
//! - Console and rolling-file structured logging via `tracing`
//! - Cache metrics (hits, misses, errors, rate-limit denials, invalidations) via Prometheus
//!
//! This module can be enabled or disabled at compile time via the `observability` feature flag.
//! At runtime, observability can be further controlled via the `OBSERVABILITY_ENABLED`
//! environment variable.
//!
//! # Features
//!
//! - `observability` (default): Enables file logging and metrics collection
//!
//! # Examples
//!
//! ```no_run
//! use voteboard_observability::{init_metrics, init_tracing};
//!
//! init_tracing();
//! let _handle = init_metrics();
//! ```

pub mod basic_logging;
#[cfg(feature = "observability")]
pub mod logging;
#[cfg(feature = "observability")]
pub mod metrics;

pub use basic_logging::init_basic_console_logging;

// Re-export PrometheusHandle type when observability is enabled
#[cfg(feature = "observability")]
pub use metrics_exporter_prometheus::PrometheusHandle;

#[cfg(feature = "observability")]
pub use logging::{init_tracing, is_observability_enabled};
#[cfg(feature = "observability")]
pub use metrics::{
    init_metrics, track_cache_error, track_cache_hit, track_cache_miss, track_invalidation,
    track_rate_limited,
};

// No-op stubs when observability is disabled
#[cfg(not(feature = "observability"))]
pub mod stubs {
    /// No-op observability check when feature disabled
    pub fn is_observability_enabled() -> bool {
        false
    }

    /// Falls back to console logging when feature disabled
    pub fn init_tracing() {
        crate::basic_logging::init_basic_console_logging();
    }

    /// No-op metrics initialization when feature disabled
    pub fn init_metrics() -> Option<()> {
        None
    }

    // No-op tracking functions
    pub fn track_cache_hit(_domain: &str) {}
    pub fn track_cache_miss(_domain: &str) {}
    pub fn track_cache_error(_operation: &'static str) {}
    pub fn track_rate_limited(_identity: &str) {}
    pub fn track_invalidation(_event: &'static str, _removed: u64, _failures: u64) {}
}

#[cfg(not(feature = "observability"))]
pub use stubs::*;
