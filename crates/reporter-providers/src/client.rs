//! The provider network contract.
//!
//! [`ProviderClient`] is the seam between the auth coordinator / runtime
//! and a provider's login and completion endpoints.
//! [`HttpProviderClient`] is the reqwest-backed implementation used for
//! HTTP providers; tests substitute scripted fakes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reporter_core::SecretString;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuthError, Result};

/// Result of starting a login flow.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginStart {
    /// Authorization URL the user should be sent to.
    #[serde(default)]
    pub auth_url: Option<String>,
}

/// Result of completing a login flow.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginCompletion {
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub token_type: Option<String>,

    /// Absolute expiry; wins over `expires_in` when both are present.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    /// Relative expiry in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Result of a remote "am I connected" check.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthStatusCheck {
    pub connected: bool,

    #[serde(default)]
    pub message: Option<String>,

    /// Opaque provider payload, passed through for diagnostics.
    #[serde(default)]
    pub raw: Option<serde_json::Value>,
}

/// A provider's login and completion endpoints.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Stable id of the provider this client talks to.
    fn provider_id(&self) -> &str;

    /// Begin a login flow bound to `state`.
    async fn start_login(
        &self,
        state: &str,
        callback_url: &str,
        redirect_to: Option<&str>,
    ) -> Result<LoginStart>;

    /// Exchange a login callback for tokens.
    async fn complete_login(
        &self,
        code: Option<&str>,
        state: &str,
        callback_url: &str,
        query_params: &HashMap<String, String>,
    ) -> Result<LoginCompletion>;

    /// Whether this provider exposes a remote connection check.
    fn supports_status_check(&self) -> bool {
        false
    }

    /// Ask the provider whether the current session is still connected.
    async fn get_auth_status(&self) -> Result<AuthStatusCheck> {
        Err(AuthError::configuration(format!(
            "provider '{}' has no remote status check",
            self.provider_id()
        )))
    }

    /// Best-effort remote revocation. Failures are the caller's to ignore.
    async fn logout(&self) -> Result<bool> {
        Ok(false)
    }

    /// Single text completion against a model endpoint.
    async fn complete_text(
        &self,
        prompt: &str,
        model: &str,
        system_prompt: Option<&str>,
        access_token: Option<&SecretString>,
    ) -> Result<String>;
}

/// HTTP implementation of the provider contract.
pub struct HttpProviderClient {
    client: Client,
    provider_id: String,
    base_url: String,
    has_status_check: bool,
}

impl HttpProviderClient {
    /// Create a client for `provider_id` rooted at `base_url`.
    pub fn new(provider_id: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let base_url: String = base_url.into();
        if base_url.is_empty() {
            return Err(AuthError::configuration("base URL is required"));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            provider_id: provider_id.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            has_status_check: false,
        })
    }

    /// Enable the remote connection check endpoint.
    pub fn with_status_check(mut self) -> Self {
        self.has_status_check = true;
        self
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Result<Self> {
        self.client = Client::builder()
            .timeout(std::time::Duration::from_secs(seconds))
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to create HTTP client: {e}")))?;
        Ok(self)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Turn a non-success response into a typed error.
async fn into_error(response: reqwest::Response) -> AuthError {
    let status = response.status();
    let message = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        AuthError::authentication(format!("provider rejected the request: {message}"))
    } else {
        AuthError::Upstream {
            status: status.as_u16(),
            message,
        }
    }
}

#[derive(Serialize)]
struct StartLoginRequest<'a> {
    state: &'a str,
    callback_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_to: Option<&'a str>,
}

#[derive(Serialize)]
struct CompleteLoginRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    state: &'a str,
    callback_url: &'a str,
    query_params: &'a HashMap<String, String>,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_prompt: Option<&'a str>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    text: String,
}

#[derive(Deserialize)]
struct LogoutResponse {
    #[serde(default)]
    ok: bool,
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn start_login(
        &self,
        state: &str,
        callback_url: &str,
        redirect_to: Option<&str>,
    ) -> Result<LoginStart> {
        debug!(provider_id = %self.provider_id, "starting provider login");
        let response = self
            .client
            .post(self.endpoint("/auth/login/start"))
            .json(&StartLoginRequest {
                state,
                callback_url,
                redirect_to,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(into_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn complete_login(
        &self,
        code: Option<&str>,
        state: &str,
        callback_url: &str,
        query_params: &HashMap<String, String>,
    ) -> Result<LoginCompletion> {
        debug!(provider_id = %self.provider_id, "completing provider login");
        let response = self
            .client
            .post(self.endpoint("/auth/login/complete"))
            .json(&CompleteLoginRequest {
                code,
                state,
                callback_url,
                query_params,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(into_error(response).await);
        }
        Ok(response.json().await?)
    }

    fn supports_status_check(&self) -> bool {
        self.has_status_check
    }

    async fn get_auth_status(&self) -> Result<AuthStatusCheck> {
        let response = self
            .client
            .get(self.endpoint("/auth/status"))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(into_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn logout(&self) -> Result<bool> {
        let response = self
            .client
            .post(self.endpoint("/auth/logout"))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(into_error(response).await);
        }
        let body: LogoutResponse = response.json().await?;
        Ok(body.ok)
    }

    async fn complete_text(
        &self,
        prompt: &str,
        model: &str,
        system_prompt: Option<&str>,
        access_token: Option<&SecretString>,
    ) -> Result<String> {
        let mut request = self
            .client
            .post(self.endpoint("/v1/completions"))
            .json(&CompletionRequest {
                model,
                prompt,
                system_prompt,
            });

        if let Some(token) = access_token {
            request = request.bearer_auth(token.expose());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(into_error(response).await);
        }
        let body: CompletionResponse = response.json().await?;
        Ok(body.text)
    }
}
