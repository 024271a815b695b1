//! Model call seam for the runtime loop.

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single model call.
///
/// The loop treats any failure -- transport error, timeout, upstream
/// rejection -- like an unparseable response: it ends the loop and the
/// caller receives the fallback draft, never this error.
#[derive(Debug, Error)]
#[error("Model call failed: {0}")]
pub struct ModelCallError(String);

impl ModelCallError {
    /// Wrap a failure message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A handle to a language model that completes one prompt at a time.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Complete `prompt` under `system_prompt` and return the raw text.
    async fn complete(&self, prompt: &str, system_prompt: &str)
        -> Result<String, ModelCallError>;
}
