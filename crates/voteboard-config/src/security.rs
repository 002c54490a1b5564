//! Security configuration for cache keys and values.
//!
//! # Environment Variables
//!
//! - `CACHE_MAX_KEY_LENGTH`: Longest accepted key (default: 250)
//! - `CACHE_KEY_PATTERN`: Regex every key must match (default: `^[A-Za-z0-9:_-]+$`)
//! - `CACHE_MAX_VALUE_SIZE`: Largest serialized value in bytes (default: 1 MiB)
//! - `CACHE_SENSITIVE_PATTERNS`: Comma-separated patterns flagging sensitive values
//! - `CACHE_ENCRYPTION_ENABLED`: Encrypt values flagged sensitive (default: false)
//! - `CACHE_ENCRYPTION_KEY`: Key material for at-rest encryption

use std::fmt;

use crate::env::{flag_or, list_or, parse_or};

pub const DEFAULT_MAX_KEY_LENGTH: usize = 250;
pub const DEFAULT_KEY_PATTERN: &str = r"^[A-Za-z0-9:_-]+$";
pub const DEFAULT_MAX_VALUE_SIZE: usize = 1024 * 1024;
pub const DEFAULT_SENSITIVE_PATTERNS: &[&str] =
    &["password", "secret", "token", "credential", "auth"];

/// Process-wide cache security settings.
///
/// Patterns are kept as raw strings here; the cache crate compiles them once
/// when it builds its security policy.
#[derive(Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    /// Maximum key length in bytes.
    pub max_key_length: usize,

    /// Regex every key must fully match.
    pub key_pattern: String,

    /// Maximum serialized value size in bytes.
    pub max_value_size: usize,

    /// Case-insensitive patterns that mark a serialized value as sensitive.
    pub sensitive_patterns: Vec<String>,

    /// Whether values flagged sensitive are encrypted before storage.
    pub enable_encryption: bool,

    /// Encryption key material. Required when `enable_encryption` is set.
    pub encryption_key: Option<String>,
}

impl SecurityConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_key_length: parse_or("CACHE_MAX_KEY_LENGTH", DEFAULT_MAX_KEY_LENGTH),
            key_pattern: std::env::var("CACHE_KEY_PATTERN")
                .unwrap_or_else(|_| DEFAULT_KEY_PATTERN.into()),
            max_value_size: parse_or("CACHE_MAX_VALUE_SIZE", DEFAULT_MAX_VALUE_SIZE),
            sensitive_patterns: list_or("CACHE_SENSITIVE_PATTERNS", DEFAULT_SENSITIVE_PATTERNS),
            enable_encryption: flag_or("CACHE_ENCRYPTION_ENABLED", false),
            encryption_key: std::env::var("CACHE_ENCRYPTION_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
        }
    }

    /// Returns a copy with encryption enabled under the given key material.
    pub fn with_encryption(mut self, key: impl Into<String>) -> Self {
        self.enable_encryption = true;
        self.encryption_key = Some(key.into());
        self
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            key_pattern: DEFAULT_KEY_PATTERN.into(),
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
            sensitive_patterns: DEFAULT_SENSITIVE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            enable_encryption: false,
            encryption_key: None,
        }
    }
}

// Key material never reaches logs.
impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("max_key_length", &self.max_key_length)
            .field("key_pattern", &self.key_pattern)
            .field("max_value_size", &self.max_value_size)
            .field("sensitive_patterns", &self.sensitive_patterns)
            .field("enable_encryption", &self.enable_encryption)
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SecurityConfig::default();
        assert_eq!(config.max_key_length, 250);
        assert_eq!(config.max_value_size, 1_048_576);
        assert!(!config.enable_encryption);
        assert!(config.encryption_key.is_none());
        assert!(config.sensitive_patterns.contains(&"password".to_string()));
    }

    #[test]
    fn test_with_encryption() {
        let config = SecurityConfig::default().with_encryption("k3y");
        assert!(config.enable_encryption);
        assert_eq!(config.encryption_key.as_deref(), Some("k3y"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = SecurityConfig::default().with_encryption("super-secret-material");
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("<redacted>"));
        assert!(!debug_str.contains("super-secret-material"));
    }
}
