//! Provider login orchestration.
//!
//! Drives the per-(provider, owner) credential lifecycle: no credential →
//! login pending → connected → expired → deleted. Login-start and
//! login-complete may race when a user double-clicks; the single-use state
//! token guarantees at most one completion wins and the loser receives the
//! uniform invalid-or-expired rejection.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reporter_core::{ProviderConfig, ProviderRegistry};
use reporter_secrets::{AccountType, AuthStateStore, CredentialStore, OAuthCredential};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{LoginCompletion, ProviderClient};
use crate::error::{AuthError, Result};
use crate::readiness::{evaluate, Readiness, ReadinessInput};

/// Connection status reported for a provider account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// The provider needs no login flow.
    Ready,

    /// A valid credential (or live remote session) exists.
    Connected,

    /// The stored credential is past its expiry.
    Expired,

    /// No credential exists.
    Disconnected,
}

/// What a successful login start hands back to the boundary layer.
#[derive(Debug, Clone, Serialize)]
pub struct StartedLogin {
    /// Authorization URL to send the user to.
    pub auth_url: String,

    /// The state token bound to this attempt.
    pub state: String,
}

/// Orchestrates login flows and credential state for one owner.
pub struct ProviderAuthCoordinator {
    registry: ProviderRegistry,
    credentials: Arc<dyn CredentialStore>,
    login_states: Arc<dyn AuthStateStore>,
    clients: HashMap<String, Arc<dyn ProviderClient>>,
    owner: String,
}

impl ProviderAuthCoordinator {
    /// Create a coordinator for `owner` over the given stores.
    pub fn new(
        registry: ProviderRegistry,
        credentials: Arc<dyn CredentialStore>,
        login_states: Arc<dyn AuthStateStore>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            credentials,
            login_states,
            clients: HashMap::new(),
            owner: owner.into(),
        }
    }

    /// Register the network client for a provider.
    pub fn with_client(mut self, client: Arc<dyn ProviderClient>) -> Self {
        self.clients.insert(client.provider_id().to_string(), client);
        self
    }

    fn config(&self, provider_id: &str) -> Result<&ProviderConfig> {
        self.registry
            .get(provider_id)
            .ok_or_else(|| AuthError::configuration(format!("unknown provider: {provider_id}")))
    }

    fn client(&self, provider_id: &str) -> Option<&Arc<dyn ProviderClient>> {
        self.clients.get(provider_id)
    }

    fn require_client(&self, provider_id: &str) -> Result<&Arc<dyn ProviderClient>> {
        self.client(provider_id).ok_or_else(|| {
            AuthError::configuration(format!("no client registered for provider: {provider_id}"))
        })
    }

    /// Begin a login flow: issue a state token and obtain the provider's
    /// authorization URL.
    pub async fn start_login(
        &self,
        provider_id: &str,
        callback_url: &str,
        redirect_to: Option<&str>,
    ) -> Result<StartedLogin> {
        let config = self.config(provider_id)?;
        if !config.enabled {
            return Err(AuthError::configuration(format!(
                "provider is disabled: {provider_id}"
            )));
        }
        if !config.auth_mode.is_oauth() {
            return Err(AuthError::configuration(format!(
                "provider does not use a login flow: {provider_id}"
            )));
        }
        let client = self.require_client(provider_id)?;

        let state = self
            .login_states
            .create(
                provider_id,
                &self.owner,
                redirect_to,
                config.login_timeout_seconds,
                Utc::now(),
            )
            .await?;

        let start = client.start_login(&state, callback_url, redirect_to).await?;
        let auth_url = start
            .auth_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                AuthError::authentication("provider returned no authorization URL")
            })?;

        debug!(provider_id, "login started");
        Ok(StartedLogin { auth_url, state })
    }

    /// Complete a login flow: consume the state token, exchange the code,
    /// and store the encrypted credential.
    ///
    /// Returns the redirect target captured when the flow started.
    pub async fn complete_login(
        &self,
        provider_id: &str,
        state: &str,
        code: Option<&str>,
        callback_url: &str,
        query_params: &HashMap<String, String>,
    ) -> Result<Option<String>> {
        let _config = self.config(provider_id)?;
        let client = self.require_client(provider_id)?;
        let now = Utc::now();

        // Consume-before-exchange: a replayed callback dies here without
        // ever reaching the provider.
        let redirect_to = self
            .login_states
            .validate_and_consume(state, provider_id, &self.owner, now)
            .await?;

        let completion = client
            .complete_login(code, state, callback_url, query_params)
            .await?;

        let access_token = completion
            .access_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AuthError::authentication("provider returned no access token"))?;

        let expires_at = resolve_expiry(&completion, now);
        let credential = OAuthCredential {
            access_token: access_token.into(),
            refresh_token: completion.refresh_token.as_deref().map(Into::into),
            token_type: completion
                .token_type
                .clone()
                .unwrap_or_else(|| "bearer".to_string()),
        };

        self.credentials
            .upsert_oauth(provider_id, &self.owner, &credential, expires_at)
            .await?;

        debug!(provider_id, "login completed");
        Ok(redirect_to)
    }

    /// Report the provider's connection status.
    ///
    /// Providers with a remote check are asked directly and the answer is
    /// mirrored into local storage, so local reads stay consistent even
    /// after out-of-band revocation. Everyone else is derived from the
    /// stored credential's expiry.
    pub async fn get_status(&self, provider_id: &str) -> Result<ConnectionStatus> {
        let config = self.config(provider_id)?;
        if !config.auth_mode.is_oauth() {
            return Ok(ConnectionStatus::Ready);
        }

        if let Some(client) = self.client(provider_id) {
            if client.supports_status_check() {
                match client.get_auth_status().await {
                    Ok(check) if check.connected => {
                        self.credentials
                            .mark_connected(provider_id, &self.owner, None)
                            .await?;
                        return Ok(ConnectionStatus::Connected);
                    }
                    Ok(_) => {
                        self.credentials.delete(provider_id, &self.owner).await?;
                        return Ok(ConnectionStatus::Disconnected);
                    }
                    Err(e) => {
                        warn!(provider_id, "remote status check failed: {e}");
                        // Fall through to the locally stored state.
                    }
                }
            }
        }

        let now = Utc::now();
        match self.credentials.account_meta(provider_id, &self.owner).await? {
            None => Ok(ConnectionStatus::Disconnected),
            Some(meta) if meta.account_type == AccountType::ApiKey => {
                Ok(ConnectionStatus::Disconnected)
            }
            Some(meta) if meta.is_expired(now) => Ok(ConnectionStatus::Expired),
            Some(_) => Ok(ConnectionStatus::Connected),
        }
    }

    /// Log out: best-effort remote revocation, then local deletion.
    ///
    /// Returns true if either side reported something to remove.
    pub async fn logout(&self, provider_id: &str) -> Result<bool> {
        let _config = self.config(provider_id)?;

        let remote = match self.client(provider_id) {
            Some(client) => client.logout().await.unwrap_or_else(|e| {
                warn!(provider_id, "remote logout failed: {e}");
                false
            }),
            None => false,
        };

        let local = self.credentials.delete(provider_id, &self.owner).await?;
        debug!(provider_id, remote, local, "logged out");
        Ok(remote || local)
    }

    /// Evaluate the provider's readiness from its configuration and stored
    /// credential state.
    pub async fn readiness(&self, provider_id: &str) -> Result<Readiness> {
        let config = self.config(provider_id)?;
        let meta = self.credentials.account_meta(provider_id, &self.owner).await?;
        let now = Utc::now();

        let has_secret = meta
            .as_ref()
            .is_some_and(|m| m.account_type == AccountType::ApiKey);
        let oauth_connected = meta
            .as_ref()
            .is_some_and(|m| m.account_type != AccountType::ApiKey && !m.is_expired(now));

        Ok(evaluate(&ReadinessInput::from_config(
            config,
            has_secret,
            oauth_connected,
        )))
    }
}

/// Pick the credential expiry from a login completion.
///
/// An absolute `expires_at` wins; otherwise a relative `expires_in` is
/// anchored to `now`.
fn resolve_expiry(completion: &LoginCompletion, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    completion.expires_at.or_else(|| {
        completion
            .expires_in
            .map(|seconds| now + Duration::seconds(seconds as i64))
    })
}
