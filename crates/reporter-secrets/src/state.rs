//! Single-use OAuth login state storage.
//!
//! A login attempt is bound to a provider and an expiry through a random
//! state token. Validation consumes the token atomically: of two racing
//! validations exactly one succeeds and the other sees the uniform
//! invalid-or-expired rejection.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, SecretError};

/// A pending login attempt row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginState {
    /// Random single-use token identifying this attempt.
    pub state: String,

    /// Provider the attempt is bound to.
    pub provider_id: String,

    /// Owner who initiated the attempt.
    pub owner: String,

    /// Where to send the user after a completed login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,

    pub created_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// Consumed tokens stay inert until purged.
    pub used: bool,
}

/// Async trait for login state storage backends.
#[async_trait]
pub trait AuthStateStore: Send + Sync {
    /// Create a login state row and return its token.
    ///
    /// Opportunistically purges this owner's expired rows first, bounding
    /// growth without a background sweeper.
    async fn create(
        &self,
        provider_id: &str,
        owner: &str,
        redirect_to: Option<&str>,
        ttl_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<String>;

    /// Atomically validate and consume a state token.
    ///
    /// Succeeds at most once per token, returning the stored redirect
    /// target. Every rejection -- unknown token, wrong provider or owner,
    /// already used, expired -- is the same
    /// [`SecretError::InvalidLoginState`] so callers cannot probe which
    /// tokens ever existed.
    async fn validate_and_consume(
        &self,
        state_token: &str,
        provider_id: &str,
        owner: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>>;

    /// Remove an owner's expired rows; returns how many were dropped.
    async fn purge_expired(&self, owner: &str, now: DateTime<Utc>) -> Result<usize>;
}

/// A JSON-file-backed login state store.
///
/// The whole table is rewritten atomically on mutation; the single write
/// lock makes validate-and-consume a true read-check-write unit.
pub struct FileAuthStateStore {
    path: PathBuf,
    rows: RwLock<HashMap<String, LoginState>>,
}

impl FileAuthStateStore {
    /// Open or create a store at `path`.
    pub fn new(path: PathBuf) -> Result<Self> {
        let rows = match std::fs::read_to_string(&path) {
            Ok(data) => {
                let states: Vec<LoginState> = serde_json::from_str(&data)?;
                states.into_iter().map(|s| (s.state.clone(), s)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(SecretError::Io(e)),
        };

        Ok(Self {
            path,
            rows: RwLock::new(rows),
        })
    }

    /// Open the default store (`~/.market-reporter/auth-state.json`).
    pub fn from_default_dir() -> Result<Self> {
        let path = reporter_core::paths::auth_state_file()
            .map_err(|e| SecretError::Storage(e.to_string()))?;
        Self::new(path)
    }

    fn save(&self, rows: &HashMap<String, LoginState>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut states: Vec<&LoginState> = rows.values().collect();
        states.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let tmp_path = self.path.with_extension("tmp");
        let data = serde_json::to_string_pretty(&states)?;
        std::fs::write(&tmp_path, data)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl AuthStateStore for FileAuthStateStore {
    async fn create(
        &self,
        provider_id: &str,
        owner: &str,
        redirect_to: Option<&str>,
        ttl_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let mut rows = self.rows.write().await;

        // Lazy purge in place of a background sweeper.
        rows.retain(|_, row| row.owner != owner || row.expires_at > now);

        let token = reporter_core::id::state_token();
        rows.insert(
            token.clone(),
            LoginState {
                state: token.clone(),
                provider_id: provider_id.to_string(),
                owner: owner.to_string(),
                redirect_to: redirect_to.map(str::to_string),
                created_at: now,
                expires_at: now + Duration::seconds(ttl_seconds as i64),
                used: false,
            },
        );
        self.save(&rows)?;
        debug!(provider_id, "issued login state token");
        Ok(token)
    }

    async fn validate_and_consume(
        &self,
        state_token: &str,
        provider_id: &str,
        owner: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let mut rows = self.rows.write().await;

        let valid = rows.get(state_token).is_some_and(|row| {
            row.provider_id == provider_id
                && row.owner == owner
                && !row.used
                && row.expires_at > now
        });
        if !valid {
            return Err(SecretError::InvalidLoginState);
        }

        let redirect_to = match rows.get_mut(state_token) {
            Some(row) => {
                row.used = true;
                row.redirect_to.clone()
            }
            None => return Err(SecretError::InvalidLoginState),
        };
        self.save(&rows)?;
        debug!(provider_id, "consumed login state token");
        Ok(redirect_to)
    }

    async fn purge_expired(&self, owner: &str, now: DateTime<Utc>) -> Result<usize> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, row| row.owner != owner || row.expires_at > now);
        let dropped = before - rows.len();
        if dropped > 0 {
            self.save(&rows)?;
            debug!(owner, dropped, "purged expired login state rows");
        }
        Ok(dropped)
    }
}
