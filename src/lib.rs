//! # Voteboard
//!
//! Application services for a contest voting platform, with a cache-aside
//! layer in front of the expensive aggregate reads.
//!
//! ## Overview
//!
//! - **Leaderboards**: platform-wide and per-contest rankings
//! - **Contests**: details, filtered listings and participant listings
//! - **Profiles**: details, rank and voting statistics
//! - **Analytics**: periodic rollups
//! - **Votes**: casting votes and per-contest tallies
//!
//! Reads go through [`voteboard_cache::CacheService::get_or_compute`] or
//! [`voteboard_cache::with_cache`]. Writes commit through the
//! [`repository::VotingRepository`] and then invalidate the affected caches.
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── modules/          # Feature modules
//! │   ├── leaderboard/
//! │   ├── contests/
//! │   ├── profiles/
//! │   ├── analytics/
//! │   └── votes/
//! ├── repository.rs     # Persistence boundary
//! ├── state.rs          # Shared application state
//! └── utils/            # Errors and pagination
//! ```
//!
//! Each feature module follows a consistent structure:
//!
//! - `mod.rs`: Module exports
//! - `service.rs`: Business logic
//! - `model.rs`: Data models and DTOs
//!
//! ## Environment Variables
//!
//! ```bash
//! CACHE_BACKEND=redis
//! REDIS_URL=redis://127.0.0.1:6379
//! CACHE_ENABLED=true
//! CACHE_ENCRYPTION_ENABLED=true
//! CACHE_ENCRYPTION_KEY=...
//! ```
//!
//! See `voteboard-config` and [`voteboard_cache::CacheConfig`] for the full list.

pub mod modules;
pub mod repository;
pub mod state;
pub mod utils;

// Re-export workspace crates for convenience
pub use voteboard_cache;
pub use voteboard_config;
pub use voteboard_observability;

pub use state::{AppState, init_app_state};
pub use utils::errors::AppError;
