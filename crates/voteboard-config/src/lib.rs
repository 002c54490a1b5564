//! # Voteboard Config
//!
//! Configuration types for the Voteboard cache layer.
//!
//! This crate provides configuration structures loaded from environment variables:
//!
//! - [`security`]: key/value validation limits and at-rest encryption
//! - [`rate_limit`]: cache operation rate limiting
//! - [`ttl`]: per-domain freshness windows
//!
//! Every config is read once at process start and treated as immutable afterwards.
//!
//! # Example
//!
//! ```ignore
//! use voteboard_config::{CacheRateLimitConfig, SecurityConfig, TtlConfig};
//!
//! let security = SecurityConfig::from_env();
//! let rate_limit = CacheRateLimitConfig::from_env();
//! let ttl = TtlConfig::from_env();
//! ```

pub mod rate_limit;
pub mod security;
pub mod ttl;

mod env;

// Re-export commonly used types at crate root
pub use rate_limit::CacheRateLimitConfig;
pub use security::SecurityConfig;
pub use ttl::TtlConfig;
