//! Utility modules shared by the feature modules.
//!
//! - [`errors`]: Application error types
//! - [`pagination`]: Request pagination utilities

pub mod errors;
pub mod pagination;
