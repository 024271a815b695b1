//! Provider readiness evaluation.
//!
//! A pure precedence check over configuration and credential state.
//! Configuration problems rank above authentication problems, so a
//! disabled or misconfigured provider never reports a login requirement.

use reporter_core::{AuthMode, ProviderConfig};
use serde::{Deserialize, Serialize};

/// Input bits for readiness evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessInput {
    pub enabled: bool,
    pub has_models: bool,
    pub auth_mode: AuthMode,
    pub secret_required: bool,
    pub has_secret: bool,
    pub base_url_required: bool,
    pub has_base_url: bool,
    pub oauth_connected: bool,
}

impl ReadinessInput {
    /// Derive the input bits from a provider's configuration plus its
    /// stored credential state, so callers don't assemble them by hand.
    pub fn from_config(config: &ProviderConfig, has_secret: bool, oauth_connected: bool) -> Self {
        Self {
            enabled: config.enabled,
            has_models: !config.models.is_empty(),
            auth_mode: config.auth_mode,
            secret_required: config.auth_mode.requires_secret(),
            has_secret,
            base_url_required: config.requires_base_url,
            has_base_url: config.has_base_url(),
            oauth_connected,
        }
    }
}

/// Why a provider is or is not usable right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadinessStatus {
    Disabled,
    NoModel,
    MissingBaseUrl,
    LoginRequired,
    MissingSecret,
    Ready,
}

/// Readiness verdict for a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub status: ReadinessStatus,
    pub message: String,
    pub ready: bool,
}

impl Readiness {
    fn new(status: ReadinessStatus, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
            ready: status == ReadinessStatus::Ready,
        }
    }
}

/// Evaluate a provider's usability. First matching rule wins.
pub fn evaluate(input: &ReadinessInput) -> Readiness {
    if !input.enabled {
        return Readiness::new(ReadinessStatus::Disabled, "Provider is disabled");
    }
    if !input.has_models {
        return Readiness::new(ReadinessStatus::NoModel, "No models configured");
    }
    if input.base_url_required && !input.has_base_url {
        return Readiness::new(ReadinessStatus::MissingBaseUrl, "Base URL is not configured");
    }
    if input.auth_mode.is_oauth() && !input.oauth_connected {
        return Readiness::new(ReadinessStatus::LoginRequired, "Login required");
    }
    if input.secret_required && !input.has_secret {
        return Readiness::new(ReadinessStatus::MissingSecret, "API key is not configured");
    }
    Readiness::new(ReadinessStatus::Ready, "Ready")
}
