//! Port trait definitions.
//!
//! The domain crate defines *what* it needs from the outside world;
//! infrastructure crates define *how* to supply it. The only port the
//! pipeline needs is a language model capable of text completion and
//! template-driven completion.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{AgentName, LlmError};

/// One text-completion request.
///
/// Optional fields fall back to the gateway's configured defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// The fully rendered prompt text.
    pub prompt: String,
    /// Sampling temperature override.
    pub temperature: Option<f32>,
    /// Maximum completion tokens override.
    pub max_tokens: Option<u32>,
    /// Per-call timeout override.
    pub timeout: Option<Duration>,
}

impl CompletionRequest {
    /// Creates a request carrying only the prompt, deferring everything else
    /// to gateway defaults.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
            timeout: None,
        }
    }
}

/// A text-completion backend.
///
/// Implementations own transport, admission control, timeouts, retries, and
/// error classification; callers receive either completion text or a
/// classified [`LlmError`]. Agents depend on this trait — never on a
/// concrete client — so tests can substitute canned models.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Completes a prompt and returns the response text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Renders the prompt template registered for `agent` with the supplied
    /// named variables, then completes it.
    ///
    /// `vars` must be a JSON object; each key names a template placeholder.
    /// Fails with [`LlmError::TemplateNotFound`] when no template exists for
    /// the active prompt-bundle version and `agent`.
    async fn complete_with_template(
        &self,
        agent: AgentName,
        vars: &Value,
    ) -> Result<String, LlmError>;
}
