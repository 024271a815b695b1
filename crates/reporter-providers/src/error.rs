//! Error types for provider authentication and invocation.

use reporter_secrets::SecretError;
use thiserror::Error;

/// Result type for provider auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Provider auth error types.
///
/// Configuration and authentication problems are distinct variants so a
/// boundary layer can prompt "log in" for one and "fix config" for the
/// other.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider is unknown, disabled, or misconfigured. The caller's
    /// fault; surfaced as a client error at the boundary.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A credential is missing, a login is required, or a login attempt
    /// was rejected.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Secret material could not be read, decrypted, or persisted. Fatal
    /// for the operation; never silently ignored.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The provider endpoint answered with a failure status.
    #[error("Provider error: {status} - {message}")]
    Upstream { status: u16, message: String },

    /// A provider network call failed outright.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl AuthError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Uniform rejection for login state problems. The same message covers
    /// tokens that never existed and tokens that were used or expired, to
    /// resist enumeration.
    pub fn invalid_login_state() -> Self {
        Self::Authentication("invalid or expired login state".to_string())
    }
}

impl From<SecretError> for AuthError {
    fn from(e: SecretError) -> Self {
        match e {
            SecretError::InvalidLoginState => Self::invalid_login_state(),
            other => Self::Storage(other.to_string()),
        }
    }
}
