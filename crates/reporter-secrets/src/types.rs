//! Stored credential shapes.

use chrono::{DateTime, Utc};
use reporter_core::SecretString;
use serde::{Deserialize, Serialize};

/// An encrypted secret as persisted at rest.
///
/// AES-256-GCM ciphertext plus the nonce drawn for that encryption, both
/// base64. The nonce is fresh per encryption call; a repeated nonce under
/// the same key would break the cipher's guarantees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    /// Ciphertext with authentication tag, base64-encoded.
    pub ciphertext: String,

    /// 96-bit nonce, base64-encoded.
    pub nonce: String,
}

/// What kind of credential an account row holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Static API key.
    ApiKey,

    /// OAuth access/refresh token blob.
    Oauth,

    /// Connection recorded from a remote status check; no token stored.
    ConnectionMarker,
}

/// A decrypted OAuth credential.
///
/// Token fields are `SecretString`, so Debug output never leaks them. The
/// struct serializes to the JSON blob that is encrypted before storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthCredential {
    pub access_token: SecretString,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<SecretString>,

    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl OAuthCredential {
    /// Create a bearer-token credential.
    pub fn bearer(access_token: impl Into<SecretString>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: default_token_type(),
        }
    }
}

/// Account metadata readable without decrypting anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub account_type: AccountType,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccountMeta {
    /// Whether the account's credential is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Metadata-only listing entry for a stored credential.
///
/// Safe to pass to presentation layers; carries no plaintext or ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSummary {
    pub provider_id: String,
    pub account_type: AccountType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
