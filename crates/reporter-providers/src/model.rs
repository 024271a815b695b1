//! Model handle adapter for the tool-calling runtime.

use std::sync::Arc;

use async_trait::async_trait;
use reporter_core::SecretString;
use reporter_runtime::{ModelCallError, ModelClient};

use crate::client::ProviderClient;

/// A resolved provider + model + credential, usable as a runtime model
/// handle.
///
/// Built by the orchestration layer once a provider evaluates as ready;
/// the access token (when the provider needs one) rides along already
/// decrypted and is dropped with this value.
pub struct ProviderModel {
    client: Arc<dyn ProviderClient>,
    model: String,
    access_token: Option<SecretString>,
}

impl ProviderModel {
    /// Create a handle for `model` on `client`.
    pub fn new(client: Arc<dyn ProviderClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            access_token: None,
        }
    }

    /// Attach the access token to send with each completion.
    pub fn with_access_token(mut self, token: SecretString) -> Self {
        self.access_token = Some(token);
        self
    }

    /// The model name this handle completes against.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelClient for ProviderModel {
    async fn complete(
        &self,
        prompt: &str,
        system_prompt: &str,
    ) -> Result<String, ModelCallError> {
        self.client
            .complete_text(
                prompt,
                &self.model,
                Some(system_prompt),
                self.access_token.as_ref(),
            )
            .await
            .map_err(|e| ModelCallError::new(e.to_string()))
    }
}
