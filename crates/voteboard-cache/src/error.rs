//! Error type for cache operations.

use crate::security::SecurityError;

/// Error type for cache operations.
///
/// Callers are expected to degrade on every variant: a failed read is a miss,
/// a failed write is logged, and the underlying computation still runs.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Rejected by cache validation: {0}")]
    Validation(SecurityError),

    #[error("Encryption error: {0}")]
    Encryption(SecurityError),

    #[error("Cache rate limit exceeded for '{identity}'")]
    RateLimited { identity: String },

    #[error("Cache {operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },
}

impl CacheError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::Connection(_) => "connection",
            CacheError::Serialization(_) => "serialization",
            CacheError::Validation(_) => "validation",
            CacheError::Encryption(_) => "encryption",
            CacheError::RateLimited { .. } => "rate_limited",
            CacheError::Timeout { .. } => "timeout",
        }
    }

    /// Connectivity and timeout failures, as opposed to rejected input.
    pub fn is_transient(&self) -> bool {
        matches!(self, CacheError::Connection(_) | CacheError::Timeout { .. })
    }
}

impl From<SecurityError> for CacheError {
    fn from(err: SecurityError) -> Self {
        if err.is_crypto() {
            CacheError::Encryption(err)
        } else {
            CacheError::Validation(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_errors_are_split_by_kind() {
        let err: CacheError = SecurityError::EmptyKey.into();
        assert_eq!(err.kind(), "validation");

        let err: CacheError = SecurityError::EncryptionKeyMissing.into();
        assert_eq!(err.kind(), "encryption");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_timeout_is_transient() {
        let err = CacheError::Timeout {
            operation: "get",
            timeout_ms: 250,
        };
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "Cache get timed out after 250ms");
    }
}
