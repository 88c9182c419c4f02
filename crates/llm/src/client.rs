use async_trait::async_trait;
use serde::Serialize;

use crate::error::LlmError;

/// A successful model response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub text: String,
    /// Prompt plus completion tokens as reported by the provider.
    pub tokens_used: i64,
    /// Model that actually served the request.
    pub model: String,
}

/// Completes a user prompt against a knowledge context.
///
/// Implementations must bound their own latency and never surface provider
/// error text in [`LlmError::user_message`].
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        context: &str,
        model: &str,
    ) -> Result<Completion, LlmError>;
}
