//! Validation, sanitisation and at-rest encryption for cache keys and values.
//!
//! Keys are frequently derived from request parameters and address a shared
//! namespace, so they are constrained before reaching a store. Values are
//! bounded in size and screened for sensitive-looking content. The screening is
//! a heuristic safety net: a value that mentions none of the configured words
//! is not thereby safe to cache.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;
use regex::{Regex, RegexSet, RegexSetBuilder};
use sha2::{Digest, Sha256};
use voteboard_config::SecurityConfig;

const NONCE_LEN: usize = 12;

/// Rejections raised by the security layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecurityError {
    #[error("cache key is empty")]
    EmptyKey,

    #[error("cache key is {len} bytes, limit is {max}")]
    KeyTooLong { len: usize, max: usize },

    #[error("cache key contains a path traversal sequence")]
    PathTraversal,

    #[error("cache key contains characters outside the allowed pattern")]
    KeyPattern,

    #[error("cached value is {size} bytes, limit is {max}")]
    ValueTooLarge { size: usize, max: usize },

    #[error("invalid security pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("no encryption key configured")]
    EncryptionKeyMissing,

    #[error("malformed cipher envelope: {0}")]
    MalformedEnvelope(&'static str),

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed: wrong key or tampered data")]
    DecryptionFailed,
}

impl SecurityError {
    /// Whether the error comes from the encryption layer rather than input validation.
    pub fn is_crypto(&self) -> bool {
        matches!(
            self,
            SecurityError::EncryptionKeyMissing
                | SecurityError::MalformedEnvelope(_)
                | SecurityError::EncryptionFailed
                | SecurityError::DecryptionFailed
        )
    }
}

/// Outcome of a successful value check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCheck {
    /// Serialized JSON form, reused for storage and encryption.
    pub serialized: String,
    pub size: usize,
    pub is_sensitive: bool,
}

/// Compiled form of [`SecurityConfig`], built once at startup.
#[derive(Debug)]
pub struct SecurityPolicy {
    max_key_length: usize,
    key_pattern: Regex,
    max_value_size: usize,
    sensitive_patterns: RegexSet,
    encrypt_sensitive: bool,
    cipher: Option<ValueCipher>,
}

impl SecurityPolicy {
    /// Compile a policy from configuration.
    ///
    /// # Errors
    ///
    /// - `InvalidPattern` if the key pattern or a sensitive pattern is not a valid regex
    /// - `EncryptionKeyMissing` if encryption is enabled without key material
    pub fn new(config: &SecurityConfig) -> Result<Self, SecurityError> {
        let key_pattern =
            Regex::new(&config.key_pattern).map_err(|e| SecurityError::InvalidPattern {
                pattern: config.key_pattern.clone(),
                reason: e.to_string(),
            })?;

        let sensitive_patterns = RegexSetBuilder::new(&config.sensitive_patterns)
            .case_insensitive(true)
            .build()
            .map_err(|e| SecurityError::InvalidPattern {
                pattern: config.sensitive_patterns.join(","),
                reason: e.to_string(),
            })?;

        if config.enable_encryption && config.encryption_key.is_none() {
            return Err(SecurityError::EncryptionKeyMissing);
        }

        Ok(Self {
            max_key_length: config.max_key_length,
            key_pattern,
            max_value_size: config.max_value_size,
            sensitive_patterns,
            encrypt_sensitive: config.enable_encryption,
            cipher: config.encryption_key.as_deref().map(ValueCipher::new),
        })
    }

    /// Check a key against length, traversal and character-set constraints.
    ///
    /// Reports pass/fail only; see [`sanitize_key`] for best-effort cleanup.
    pub fn validate_key(&self, key: &str) -> Result<(), SecurityError> {
        if key.is_empty() {
            return Err(SecurityError::EmptyKey);
        }
        if key.len() > self.max_key_length {
            return Err(SecurityError::KeyTooLong {
                len: key.len(),
                max: self.max_key_length,
            });
        }
        if key.contains("..") || key.contains("//") || key.contains('\\') {
            return Err(SecurityError::PathTraversal);
        }
        if !self.key_pattern.is_match(key) {
            return Err(SecurityError::KeyPattern);
        }
        Ok(())
    }

    /// Serialize a value, bound its size and flag sensitive-looking content.
    ///
    /// Oversized values are rejected whether or not they are sensitive.
    pub fn validate_value(&self, value: &serde_json::Value) -> Result<ValueCheck, SecurityError> {
        let serialized = value.to_string();
        let size = serialized.len();

        if size > self.max_value_size {
            return Err(SecurityError::ValueTooLarge {
                size,
                max: self.max_value_size,
            });
        }

        let is_sensitive = self.sensitive_patterns.is_match(&serialized);

        Ok(ValueCheck {
            serialized,
            size,
            is_sensitive,
        })
    }

    /// Whether a checked value must be encrypted before storage.
    pub fn should_encrypt(&self, check: &ValueCheck) -> bool {
        self.encrypt_sensitive && check.is_sensitive
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, SecurityError> {
        self.cipher
            .as_ref()
            .ok_or(SecurityError::EncryptionKeyMissing)?
            .encrypt(plaintext)
    }

    pub fn decrypt(&self, envelope: &str) -> Result<String, SecurityError> {
        self.cipher
            .as_ref()
            .ok_or(SecurityError::EncryptionKeyMissing)?
            .decrypt(envelope)
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        // The default configuration compiles and carries no encryption flag.
        Self::new(&SecurityConfig::default()).expect("default security config is valid")
    }
}

/// Best-effort key cleanup.
///
/// Replaces every character outside `[A-Za-z0-9:_-]` with `_`, collapses runs
/// of `_` and trims leading/trailing `_`. Idempotent. The result may still be
/// empty or too long; run [`SecurityPolicy::validate_key`] on it as usual.
pub fn sanitize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());

    for c in key.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_') {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    out.trim_matches('_').to_string()
}

/// AES-256-GCM cipher over UTF-8 strings.
///
/// The key is the SHA-256 digest of the configured key material. Every call to
/// [`encrypt`](Self::encrypt) draws a fresh random 96-bit nonce; the envelope
/// is `hex(nonce):hex(ciphertext || tag)`.
#[derive(Clone)]
pub struct ValueCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for ValueCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCipher").finish_non_exhaustive()
    }
}

impl ValueCipher {
    pub fn new(key_material: &str) -> Self {
        let digest = Sha256::digest(key_material.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, SecurityError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| SecurityError::EncryptionFailed)?;

        Ok(format!(
            "{}:{}",
            hex::encode(nonce_bytes),
            hex::encode(ciphertext)
        ))
    }

    pub fn decrypt(&self, envelope: &str) -> Result<String, SecurityError> {
        let parts: Vec<&str> = envelope.split(':').collect();
        let [nonce_hex, ciphertext_hex] = parts.as_slice() else {
            return Err(SecurityError::MalformedEnvelope("expected 'iv:ciphertext'"));
        };

        let nonce_bytes = hex::decode(nonce_hex)
            .map_err(|_| SecurityError::MalformedEnvelope("iv is not hex"))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(SecurityError::MalformedEnvelope("iv has the wrong length"));
        }
        let ciphertext = hex::decode(ciphertext_hex)
            .map_err(|_| SecurityError::MalformedEnvelope("ciphertext is not hex"))?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|_| SecurityError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| SecurityError::DecryptionFailed)
    }
}

/// Random key material suitable for `CACHE_ENCRYPTION_KEY` (64 hex chars).
pub fn generate_key_material() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
