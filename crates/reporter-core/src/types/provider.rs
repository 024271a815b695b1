//! Provider configuration types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a provider authenticates outbound calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// No credential required.
    #[default]
    None,

    /// Static API key, stored encrypted at rest.
    ApiKey,

    /// OAuth-style login flow producing an access token.
    Oauth,
}

impl AuthMode {
    /// Whether this mode needs a stored secret before invocation.
    pub fn requires_secret(&self) -> bool {
        matches!(self, Self::ApiKey)
    }

    /// Whether this mode uses the interactive login flow.
    pub fn is_oauth(&self) -> bool {
        matches!(self, Self::Oauth)
    }
}

/// Static configuration for one model provider.
///
/// Owned by the boundary layer's configuration source; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Stable provider identifier (e.g. "openai", "finbot").
    pub provider_id: String,

    /// Provider implementation kind (e.g. "openai_compatible").
    #[serde(rename = "type")]
    pub kind: String,

    /// Credential flow this provider uses.
    #[serde(default)]
    pub auth_mode: AuthMode,

    /// Endpoint base URL, where the provider kind needs one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Models this provider can serve, first entry is the default.
    #[serde(default)]
    pub models: Vec<String>,

    /// Whether the provider may be invoked at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Whether this provider kind requires an explicit base URL.
    #[serde(default)]
    pub requires_base_url: bool,

    /// TTL for login state tokens issued on behalf of this provider.
    #[serde(default = "default_login_timeout")]
    pub login_timeout_seconds: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_login_timeout() -> u64 {
    600
}

impl ProviderConfig {
    /// The provider's default model, if any is configured.
    pub fn default_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }

    /// Whether a non-empty base URL is configured.
    pub fn has_base_url(&self) -> bool {
        self.base_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// An explicit, per-session collection of provider configurations.
///
/// Constructed by the boundary layer from its configuration source and
/// passed by reference to the components that need it. Nothing in this
/// workspace holds a process-global registry.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderConfig>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of provider configurations.
    ///
    /// Later entries with a duplicate `provider_id` replace earlier ones.
    pub fn from_configs(configs: impl IntoIterator<Item = ProviderConfig>) -> Self {
        let mut registry = Self::new();
        for config in configs {
            registry.insert(config);
        }
        registry
    }

    /// Add or replace a provider configuration.
    pub fn insert(&mut self, config: ProviderConfig) {
        self.providers.insert(config.provider_id.clone(), config);
    }

    /// Look up a provider by id.
    pub fn get(&self, provider_id: &str) -> Option<&ProviderConfig> {
        self.providers.get(provider_id)
    }

    /// All registered provider ids, sorted for stable iteration.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
