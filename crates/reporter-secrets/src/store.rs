//! Encrypted credential storage, one account row per (provider, owner).
//!
//! Defines the [`CredentialStore`] trait and [`FileCredentialStore`], a
//! JSON-file-backed implementation. Rows hold ciphertext only; decryption
//! happens at read time and plaintext never outlives the caller's frame.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reporter_core::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::cipher;
use crate::error::{Result, SecretError};
use crate::master_key::MasterKeyProvider;
use crate::types::{AccountMeta, AccountType, CredentialSummary, EncryptedSecret, OAuthCredential};

/// Async trait for credential storage backends.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Store an API key for a provider, replacing any existing account row.
    async fn put_api_key(&self, provider_id: &str, owner: &str, key: &str) -> Result<()>;

    /// Retrieve and decrypt a stored API key.
    async fn get_api_key(&self, provider_id: &str, owner: &str) -> Result<Option<SecretString>>;

    /// Store an OAuth credential, replacing any existing account row.
    /// `expires_at` is metadata kept in the clear, not secret material.
    async fn upsert_oauth(
        &self,
        provider_id: &str,
        owner: &str,
        credential: &OAuthCredential,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Retrieve and decrypt a stored OAuth credential.
    ///
    /// Connection-marker rows yield `None`: a marker records that a remote
    /// session exists, it is not a token and must never be used as one.
    async fn get_oauth(&self, provider_id: &str, owner: &str) -> Result<Option<OAuthCredential>>;

    /// Record that a provider is connected without storing a token.
    ///
    /// Idempotent. When a genuine token row already exists only its expiry
    /// metadata is refreshed, so the token is never clobbered by a marker.
    async fn mark_connected(
        &self,
        provider_id: &str,
        owner: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Account metadata, readable without touching ciphertext.
    async fn account_meta(&self, provider_id: &str, owner: &str) -> Result<Option<AccountMeta>>;

    /// Metadata-only listing of an owner's stored credentials.
    async fn list(&self, owner: &str) -> Result<Vec<CredentialSummary>>;

    /// Delete an account row. Idempotent; returns whether a row existed.
    async fn delete(&self, provider_id: &str, owner: &str) -> Result<bool>;
}

/// On-disk representation of one account row.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAccount {
    provider_id: String,
    owner: String,
    account_type: AccountType,
    /// Absent for connection markers, present otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret: Option<EncryptedSecret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A JSON-file-backed credential store.
///
/// All rows live in one file; every mutation rewrites it atomically
/// (write to tmp, then rename) so readers never observe a partial store.
pub struct FileCredentialStore {
    path: PathBuf,
    master_key: Vec<u8>,
    rows: RwLock<HashMap<String, StoredAccount>>,
}

impl FileCredentialStore {
    /// Open or create a store at `path` using the provided master key.
    pub fn new(path: PathBuf, master_key: Vec<u8>) -> Result<Self> {
        let rows = match std::fs::read_to_string(&path) {
            Ok(data) => {
                let accounts: Vec<StoredAccount> = serde_json::from_str(&data)?;
                accounts
                    .into_iter()
                    .map(|a| (row_key(&a.provider_id, &a.owner), a))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(SecretError::Io(e)),
        };

        Ok(Self {
            path,
            master_key,
            rows: RwLock::new(rows),
        })
    }

    /// Open the default store (`~/.market-reporter/credentials.json`) with
    /// the master key resolved from the file sitting next to it.
    pub fn from_default_dir() -> Result<Self> {
        let path = reporter_core::paths::credentials_file()
            .map_err(|e| SecretError::Storage(e.to_string()))?;
        let master_key = MasterKeyProvider::beside_store(&path).get_or_create()?;
        Self::new(path, master_key)
    }

    /// Atomically persist the current rows to disk.
    fn save(&self, rows: &HashMap<String, StoredAccount>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let _ = std::fs::set_permissions(
                        parent,
                        std::fs::Permissions::from_mode(0o700),
                    );
                }
            }
        }

        let mut accounts: Vec<&StoredAccount> = rows.values().collect();
        accounts.sort_by(|a, b| {
            (a.owner.as_str(), a.provider_id.as_str())
                .cmp(&(b.owner.as_str(), b.provider_id.as_str()))
        });

        let tmp_path = self.path.with_extension("tmp");
        let data = serde_json::to_string_pretty(&accounts)?;
        std::fs::write(&tmp_path, data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600));
        }

        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Replace the row for (provider, owner), preserving `created_at`.
    async fn put_row(
        &self,
        provider_id: &str,
        owner: &str,
        account_type: AccountType,
        secret: Option<EncryptedSecret>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let now = Utc::now();
        let key = row_key(provider_id, owner);

        let mut rows = self.rows.write().await;
        let created_at = rows.get(&key).map(|r| r.created_at).unwrap_or(now);
        rows.insert(
            key,
            StoredAccount {
                provider_id: provider_id.to_string(),
                owner: owner.to_string(),
                account_type,
                secret,
                expires_at,
                created_at,
                updated_at: now,
            },
        );
        self.save(&rows)?;
        debug!(provider_id, ?account_type, "stored credential row");
        Ok(())
    }
}

fn row_key(provider_id: &str, owner: &str) -> String {
    format!("{owner}/{provider_id}")
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn put_api_key(&self, provider_id: &str, owner: &str, key: &str) -> Result<()> {
        let secret = cipher::encrypt(key, &self.master_key)?;
        self.put_row(provider_id, owner, AccountType::ApiKey, Some(secret), None)
            .await
    }

    async fn get_api_key(&self, provider_id: &str, owner: &str) -> Result<Option<SecretString>> {
        let rows = self.rows.read().await;
        let Some(row) = rows.get(&row_key(provider_id, owner)) else {
            return Ok(None);
        };
        let (AccountType::ApiKey, Some(secret)) = (row.account_type, row.secret.as_ref()) else {
            return Ok(None);
        };
        let plaintext = cipher::decrypt(secret, &self.master_key)?;
        Ok(Some(SecretString::new(plaintext)))
    }

    async fn upsert_oauth(
        &self,
        provider_id: &str,
        owner: &str,
        credential: &OAuthCredential,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let blob = serde_json::to_string(credential)?;
        let secret = cipher::encrypt(&blob, &self.master_key)?;
        self.put_row(provider_id, owner, AccountType::Oauth, Some(secret), expires_at)
            .await
    }

    async fn get_oauth(&self, provider_id: &str, owner: &str) -> Result<Option<OAuthCredential>> {
        let rows = self.rows.read().await;
        let Some(row) = rows.get(&row_key(provider_id, owner)) else {
            return Ok(None);
        };
        let (AccountType::Oauth, Some(secret)) = (row.account_type, row.secret.as_ref()) else {
            return Ok(None);
        };
        let blob = cipher::decrypt(secret, &self.master_key)?;
        let credential: OAuthCredential = serde_json::from_str(&blob)?;
        Ok(Some(credential))
    }

    async fn mark_connected(
        &self,
        provider_id: &str,
        owner: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let now = Utc::now();
        let key = row_key(provider_id, owner);

        let mut rows = self.rows.write().await;
        let has_token = rows
            .get(&key)
            .is_some_and(|row| row.account_type == AccountType::Oauth && row.secret.is_some());

        if has_token {
            // A genuine token row: refresh its metadata only.
            if let Some(row) = rows.get_mut(&key) {
                row.expires_at = expires_at;
                row.updated_at = now;
            }
        } else {
            let created_at = rows.get(&key).map(|r| r.created_at).unwrap_or(now);
            rows.insert(
                key,
                StoredAccount {
                    provider_id: provider_id.to_string(),
                    owner: owner.to_string(),
                    account_type: AccountType::ConnectionMarker,
                    secret: None,
                    expires_at,
                    created_at,
                    updated_at: now,
                },
            );
        }
        self.save(&rows)?;
        debug!(provider_id, "recorded provider connection");
        Ok(())
    }

    async fn account_meta(&self, provider_id: &str, owner: &str) -> Result<Option<AccountMeta>> {
        let rows = self.rows.read().await;
        Ok(rows.get(&row_key(provider_id, owner)).map(|row| AccountMeta {
            account_type: row.account_type,
            expires_at: row.expires_at,
        }))
    }

    async fn list(&self, owner: &str) -> Result<Vec<CredentialSummary>> {
        let rows = self.rows.read().await;
        let mut summaries: Vec<CredentialSummary> = rows
            .values()
            .filter(|row| row.owner == owner)
            .map(|row| CredentialSummary {
                provider_id: row.provider_id.clone(),
                account_type: row.account_type,
                expires_at: row.expires_at,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.provider_id.cmp(&b.provider_id));
        Ok(summaries)
    }

    async fn delete(&self, provider_id: &str, owner: &str) -> Result<bool> {
        let mut rows = self.rows.write().await;
        let existed = rows.remove(&row_key(provider_id, owner)).is_some();
        if existed {
            self.save(&rows)?;
            debug!(provider_id, "deleted credential row");
        }
        Ok(existed)
    }
}
