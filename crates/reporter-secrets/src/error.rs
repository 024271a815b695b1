//! Error types for credential and key storage.

use thiserror::Error;

/// Convenience result alias for secret operations.
pub type Result<T> = std::result::Result<T, SecretError>;

/// Errors that can occur during credential operations.
#[derive(Debug, Error)]
pub enum SecretError {
    /// Authenticated decryption failed. The blob was tampered with or the
    /// master key is wrong; no partial plaintext is ever produced.
    #[error("Corrupted secret: {0}")]
    CorruptedSecret(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// The master key could not be read from or persisted to any backend.
    #[error("Key storage error: {0}")]
    KeyStorage(String),

    /// A stored or supplied master key failed validation. Surfaced rather
    /// than silently regenerating: a fresh key would make every previously
    /// encrypted secret unrecoverable.
    #[error("Invalid master key from {origin}: {reason}")]
    InvalidKey { origin: String, reason: String },

    /// Uniform rejection for login state tokens. The same error covers
    /// unknown, already-used, mismatched, and expired tokens so callers
    /// cannot probe which tokens ever existed.
    #[error("invalid or expired login state")]
    InvalidLoginState,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
