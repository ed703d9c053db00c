//! Secret resolution and at-rest encryption of mailbox credentials.
//!
//! Secrets can come from two places, in priority order:
//!
//! 1. **Direct value** - e.g. `TOKEN_ENCRYPTION_KEY=...` in the environment
//! 2. **File reference** - Docker/Cloud Run secrets pattern, e.g.
//!    `TOKEN_ENCRYPTION_KEY_FILE=/run/secrets/token-key`
//!
//! The [`TokenCodec`] encrypts long-lived refresh credentials (and cached
//! access credentials) before they reach the store.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use std::fs;

/// Error type for secret resolution and token encryption failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Encryption error: {0}")]
    Encryption(String),

    /// The ciphertext did not verify. Covers tampering, truncation and
    /// anything that cannot be split into nonce, tag and ciphertext.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),
}

/// Result type for secret operations.
pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from a direct value or, failing that, a file.
///
/// Empty values are treated as absent. File contents are trimmed, since
/// mounted secrets usually end with a newline. Returns `Ok(None)` when no
/// source is configured.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    file_path: Option<&str>,
) -> Result<Option<SecretString>> {
    if let Some(value) = direct {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Ok(Some(SecretString::from(trimmed.to_string())));
        }
    }

    if let Some(path) = file_path {
        if !path.is_empty() {
            let expanded = expand_home(path);
            return match fs::read_to_string(&expanded) {
                Ok(content) => Ok(Some(SecretString::from(content.trim().to_string()))),
                Err(e) => Err(SecretError::FileReadError {
                    path: expanded,
                    source: e,
                }),
            };
        }
    }

    Ok(None)
}

/// Expands a leading `~` to the user's home directory.
///
/// `~user/path` is not supported.
pub fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

// ============================================
// Token Encryption
// ============================================

/// Key size for AES-256-GCM.
const KEY_SIZE: usize = 32;

/// Nonce size for AES-256-GCM (96 bits = 12 bytes).
const NONCE_SIZE: usize = 12;

/// Authentication tag size for AES-256-GCM.
const TAG_SIZE: usize = 16;

/// Authenticated encryption of opaque secrets using AES-256-GCM.
///
/// Output format: `base64(<12-byte nonce><16-byte tag><ciphertext>)`.
/// A fresh nonce is drawn for every call to [`TokenCodec::encrypt`].
pub struct TokenCodec {
    cipher: Aes256Gcm,
}

impl TokenCodec {
    /// Creates a codec from a base64-encoded 32-byte key.
    pub fn from_base64_key(key_b64: &str) -> Result<Self> {
        let key_bytes = STANDARD
            .decode(key_b64.trim())
            .map_err(|e| SecretError::InvalidKey(format!("Invalid base64 key: {}", e)))?;

        if key_bytes.len() != KEY_SIZE {
            return Err(SecretError::InvalidKey(format!(
                "Key must be {} bytes, got {} bytes",
                KEY_SIZE,
                key_bytes.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| SecretError::InvalidKey(format!("Failed to create cipher: {}", e)))?;

        Ok(Self { cipher })
    }

    /// Creates a codec from configured key material.
    pub fn from_secret(key: &SecretString) -> Result<Self> {
        Self::from_base64_key(key.expose_secret())
    }

    /// Encrypts `plaintext` for storage.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce_bytes = rand_bytes::<NONCE_SIZE>()
            .map_err(|e| SecretError::Encryption(format!("Failed to generate nonce: {}", e)))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(nonce, b"", &mut buffer)
            .map_err(|e| SecretError::Encryption(e.to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + TAG_SIZE + buffer.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(tag.as_slice());
        combined.extend_from_slice(&buffer);

        Ok(STANDARD.encode(combined))
    }

    /// Decrypts a value produced by [`TokenCodec::encrypt`].
    ///
    /// Never returns partial or unverified plaintext.
    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let combined = STANDARD
            .decode(encoded.trim())
            .map_err(|e| SecretError::Authentication(format!("Invalid base64: {}", e)))?;

        if combined.len() < NONCE_SIZE + TAG_SIZE {
            return Err(SecretError::Authentication(
                "Ciphertext too short".to_string(),
            ));
        }

        let (nonce_bytes, rest) = combined.split_at(NONCE_SIZE);
        let (tag_bytes, ciphertext) = rest.split_at(TAG_SIZE);

        let mut buffer = ciphertext.to_vec();
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce_bytes),
                b"",
                &mut buffer,
                Tag::from_slice(tag_bytes),
            )
            .map_err(|_| SecretError::Authentication("Tag mismatch".to_string()))?;

        String::from_utf8(buffer)
            .map_err(|e| SecretError::Authentication(format!("Invalid UTF-8: {}", e)))
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

/// Fills a fixed-size array from the OS random number generator.
pub(crate) fn rand_bytes<const N: usize>() -> std::result::Result<[u8; N], getrandom::Error> {
    let mut bytes = [0u8; N];
    getrandom::fill(&mut bytes)?;
    Ok(bytes)
}
