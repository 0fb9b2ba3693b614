//! Process settings from flags and environment variables.
//!
//! The core crates treat every value here as a read-only input supplied at
//! process start; nothing mutates settings after parsing.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};

use llm::{GatewayConfig, RetryConfig};
use pipeline::{ApiVersion, LogicVersion, SchemaVersion, VersionMetadata};

/// Output format for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Newline-delimited JSON events.
    Json,
    /// Human-readable text.
    Text,
}

/// DecisionFlow service settings.
#[derive(Debug, Clone, Parser)]
#[command(name = "decisionflow", about = "DecisionFlow decision-analysis service")]
pub struct Settings {
    /// Address the HTTP server binds to.
    #[arg(long, env = "DECISIONFLOW_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port the HTTP server binds to.
    #[arg(long, env = "DECISIONFLOW_PORT", default_value_t = 8000)]
    pub port: u16,

    /// API key for the chat-completions provider.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// Base URL of the chat-completions API.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Model name sent with every completion request.
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-3.5-turbo")]
    pub openai_model: String,

    /// Sampling temperature (0.0 for deterministic output).
    #[arg(long, env = "OPENAI_TEMPERATURE", default_value_t = 0.0)]
    pub openai_temperature: f32,

    /// Maximum completion tokens per call.
    #[arg(long, env = "OPENAI_MAX_TOKENS", default_value_t = 2000)]
    pub openai_max_tokens: u32,

    /// Per-call timeout in seconds.
    #[arg(long, env = "LLM_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub llm_request_timeout_secs: u64,

    /// Ceiling on simultaneous outbound LLM calls, process-wide.
    #[arg(long, env = "LLM_MAX_CONCURRENT_REQUESTS", default_value_t = 5)]
    pub llm_max_concurrent_requests: usize,

    /// Maximum retries after the first attempt of a retryable failure.
    #[arg(long, env = "LLM_MAX_RETRIES", default_value_t = 2)]
    pub llm_max_retries: u32,

    /// API contract version echoed in responses.
    #[arg(long, env = "DECISIONFLOW_API_VERSION", default_value = "v1")]
    pub api_version: String,

    /// Prompt-bundle version; selects the `prompts/<version>/` directory.
    #[arg(long, env = "DECISIONFLOW_LOGIC_VERSION", default_value = "v1.0.0")]
    pub logic_version: String,

    /// JSON schema version echoed in responses.
    #[arg(long, env = "DECISIONFLOW_SCHEMA_VERSION", default_value = "v1.0.0")]
    pub schema_version: String,

    /// Directory containing the versioned prompt bundles.
    #[arg(long, env = "DECISIONFLOW_PROMPTS_DIR", default_value = "prompts")]
    pub prompts_dir: PathBuf,

    /// Log output format.
    #[arg(long, env = "DECISIONFLOW_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Default log level when `RUST_LOG` is unset.
    #[arg(long, env = "DECISIONFLOW_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Settings {
    /// Resolves the bind address.
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }

    /// Builds the version metadata echoed in every response.
    pub fn version_metadata(&self) -> anyhow::Result<VersionMetadata> {
        Ok(VersionMetadata {
            api_version: ApiVersion::new(self.api_version.clone())
                .context("api_version must not be empty")?,
            logic_version: LogicVersion::new(self.logic_version.clone())
                .context("logic_version must not be empty")?,
            schema_version: SchemaVersion::new(self.schema_version.clone())
                .context("schema_version must not be empty")?,
        })
    }

    /// Builds the gateway configuration.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.openai_base_url.clone(),
            api_key: self.openai_api_key.clone(),
            model: self.openai_model.clone(),
            temperature: self.openai_temperature,
            max_tokens: self.openai_max_tokens,
            request_timeout: Duration::from_secs(self.llm_request_timeout_secs),
            max_concurrent_requests: self.llm_max_concurrent_requests,
            retry: RetryConfig {
                max_retries: self.llm_max_retries,
                ..RetryConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::parse_from(["decisionflow", "--openai-api-key", "test-key"])
    }

    #[test]
    fn defaults_are_sensible() {
        let s = settings();
        assert_eq!(s.port, 8000);
        assert_eq!(s.openai_model, "gpt-3.5-turbo");
        assert_eq!(s.llm_max_concurrent_requests, 5);
        assert_eq!(s.llm_request_timeout_secs, 30);
        assert_eq!(s.logic_version, "v1.0.0");
    }

    #[test]
    fn bind_addr_parses() {
        let addr = settings().bind_addr().unwrap();
        assert_eq!(addr.port(), 8000);
    }

    #[test]
    fn version_metadata_uses_configured_versions() {
        let meta = settings().version_metadata().unwrap();
        assert_eq!(meta.api_version.as_str(), "v1");
        assert_eq!(meta.logic_version.as_str(), "v1.0.0");
    }

    #[test]
    fn gateway_config_carries_retry_limit() {
        let mut s = settings();
        s.llm_max_retries = 4;
        assert_eq!(s.gateway_config().retry.max_retries, 4);
    }
}
