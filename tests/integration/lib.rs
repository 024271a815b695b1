//! Shared fakes and helpers for Market Reporter integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reporter_core::SecretString;
use reporter_providers::client::{AuthStatusCheck, LoginCompletion, LoginStart, ProviderClient};
use reporter_providers::Result;

/// Install a test tracing subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A provider whose login endpoints succeed with fixed tokens and whose
/// completion endpoint plays back scripted responses.
///
/// Records the access token presented with each completion so tests can
/// assert that the credential resolved through the store made it onto the
/// wire.
pub struct ScriptedProviderClient {
    provider_id: String,
    completions: Mutex<Vec<String>>,
    pub seen_tokens: Mutex<Vec<Option<String>>>,
}

impl ScriptedProviderClient {
    pub fn new(provider_id: &str, completions: &[&str]) -> Self {
        let mut queue: Vec<String> = completions.iter().map(|s| s.to_string()).collect();
        queue.reverse();
        Self {
            provider_id: provider_id.to_string(),
            completions: Mutex::new(queue),
            seen_tokens: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ProviderClient for ScriptedProviderClient {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn start_login(
        &self,
        _state: &str,
        _callback_url: &str,
        _redirect_to: Option<&str>,
    ) -> Result<LoginStart> {
        Ok(LoginStart {
            auth_url: Some("https://login.example.com/authorize".to_string()),
        })
    }

    async fn complete_login(
        &self,
        _code: Option<&str>,
        _state: &str,
        _callback_url: &str,
        _query_params: &HashMap<String, String>,
    ) -> Result<LoginCompletion> {
        Ok(LoginCompletion {
            access_token: Some("tok-access".to_string()),
            refresh_token: Some("tok-refresh".to_string()),
            token_type: Some("bearer".to_string()),
            expires_at: None,
            expires_in: Some(3600),
        })
    }

    async fn get_auth_status(&self) -> Result<AuthStatusCheck> {
        Ok(AuthStatusCheck {
            connected: true,
            message: None,
            raw: None,
        })
    }

    async fn logout(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete_text(
        &self,
        _prompt: &str,
        _model: &str,
        _system_prompt: Option<&str>,
        access_token: Option<&SecretString>,
    ) -> Result<String> {
        self.seen_tokens
            .lock()
            .unwrap()
            .push(access_token.map(|t| t.expose().to_string()));
        Ok(self
            .completions
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| "no script left".to_string()))
    }
}
