//! Chat-completion gateway.
//!
//! [`ChatGateway`] is the only component that talks to the completion API.
//! It enforces the process-wide admission ceiling (a counting semaphore
//! shared across all in-flight calls), the per-call timeout, the retry
//! policy, and empty-completion rejection, and it layers template rendering
//! on top via the [`PromptLibrary`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use pipeline::{AgentName, CompletionRequest, LanguageModel, LlmError};

use crate::classify::{classify_http_failure, classify_transport};
use crate::prompts::PromptLibrary;
use crate::retry::{retry_with_backoff, RetryConfig};

/// Gateway construction parameters, supplied by the composition root.
///
/// The gateway treats these as read-only for its lifetime.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the chat-completions API (e.g. `https://api.openai.com/v1`).
    pub base_url: String,
    /// Bearer token for the API.
    pub api_key: String,
    /// Model name sent with every request.
    pub model: String,
    /// Default sampling temperature (0.0 for deterministic output).
    pub temperature: f32,
    /// Default maximum completion tokens.
    pub max_tokens: u32,
    /// Default per-call timeout.
    pub request_timeout: Duration,
    /// Admission ceiling: simultaneous outbound calls never exceed this.
    pub max_concurrent_requests: usize,
    /// Retry policy shared by every call.
    pub retry: RetryConfig,
}

/// Bounded-concurrency, retried, timeout-guarded completion client.
pub struct ChatGateway {
    http: Client,
    config: GatewayConfig,
    permits: Arc<tokio::sync::Semaphore>,
    prompts: Arc<PromptLibrary>,
}

impl ChatGateway {
    /// Creates a gateway from configuration and a prompt library.
    ///
    /// Fails when the API key is empty or the admission ceiling is zero.
    pub fn new(config: GatewayConfig, prompts: Arc<PromptLibrary>) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Configuration {
                detail: "API key is required".to_string(),
            });
        }
        if config.max_concurrent_requests == 0 {
            return Err(LlmError::Configuration {
                detail: "max_concurrent_requests must be at least 1".to_string(),
            });
        }
        let permits = Arc::new(tokio::sync::Semaphore::new(config.max_concurrent_requests));
        Ok(Self {
            http: Client::default(),
            config,
            permits,
            prompts,
        })
    }

    /// Returns the prompt library backing template completions.
    pub fn prompts(&self) -> &Arc<PromptLibrary> {
        &self.prompts
    }

    /// One admission-controlled, timeout-guarded attempt.
    async fn attempt(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| LlmError::Configuration {
                detail: "admission semaphore closed".to_string(),
            })?;

        let timeout = request.timeout.unwrap_or(self.config.request_timeout);
        let timeout_secs = timeout.as_secs();
        let body = json!({
            "model": self.config.model.as_str(),
            "messages": [
                { "role": "user", "content": request.prompt.as_str() },
            ],
            "temperature": request.temperature.unwrap_or(self.config.temperature),
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
        });
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let exchange = async {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|err| classify_transport(&err, timeout_secs))?;

            let status = response.status();
            if !status.is_success() {
                let retry_after = parse_retry_after(response.headers());
                let text = response.text().await.unwrap_or_default();
                return Err(classify_http_failure(status.as_u16(), retry_after, &text));
            }

            let payload: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|err| LlmError::InvalidResponse {
                    detail: err.to_string(),
                })?;
            extract_content(payload)
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                seconds: timeout_secs,
            }),
        }
    }
}

#[async_trait]
impl LanguageModel for ChatGateway {
    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let text = retry_with_backoff(|| self.attempt(&request), &self.config.retry).await?;
        debug!(chars = text.len(), "completion received");
        Ok(text)
    }

    async fn complete_with_template(
        &self,
        agent: AgentName,
        vars: &Value,
    ) -> Result<String, LlmError> {
        let prompt = self.prompts.render(agent, vars)?;
        self.complete(CompletionRequest::from_prompt(prompt)).await
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Response payload returned by the chat-completions API.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    /// Generated choices; the first carries the completion.
    choices: Vec<Choice>,
}

/// Individual completion choice.
#[derive(Debug, Deserialize)]
struct Choice {
    /// Message payload representing the completion text.
    message: Message,
}

/// Message structure containing generated content.
#[derive(Debug, Deserialize)]
struct Message {
    /// Text content produced by the model. Absent on some refusals.
    content: Option<String>,
}

/// Extracts the first choice's content, rejecting empty completions.
fn extract_content(payload: ChatCompletionResponse) -> Result<String, LlmError> {
    let content = payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();
    if content.trim().is_empty() {
        return Err(LlmError::EmptyCompletion);
    }
    Ok(content)
}

/// Parses an integral `Retry-After` header value (seconds), if present.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}
