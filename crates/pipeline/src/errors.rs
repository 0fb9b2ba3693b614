//! Error and retry-policy types for the DecisionFlow pipeline.
//!
//! [`LlmError`] is the closed taxonomy of transport-level failures: a single
//! classification function at the gateway boundary produces these variants,
//! and nothing downstream ever re-inspects provider error shapes.
//! [`AgentError`] attributes a failure to one pipeline step;
//! [`PipelineError`] is the orchestrator's wrapper adding the request id.
//!
//! [`RetryPolicy`] is a cross-cutting concern: any error type that
//! participates in retry decisions must be able to produce a [`RetryPolicy`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AgentName, RequestId, StateError};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// Returned by infrastructure error types to let the retry loop decide
/// whether to re-invoke an operation without escalating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    ///
    /// `after` optionally specifies the minimum delay before retrying (e.g.
    /// derived from a `Retry-After` response header).
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried; the failure surfaces immediately.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Transport-level errors
// ---------------------------------------------------------------------------

/// Classified failures of the LLM gateway.
///
/// Produced exclusively by the gateway's classification point. Variants are
/// partitioned into retryable (timeout, network, transient 5xx) and
/// non-retryable (client errors, rate limit, quota, malformed transport
/// responses); [`LlmError::retry_policy`] is the only retry-relevant view.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum LlmError {
    /// The request exceeded the per-call timeout. Retryable.
    #[error("LLM request timed out after {seconds} seconds")]
    Timeout {
        /// Configured timeout that elapsed.
        seconds: u64,
    },

    /// A connection-class transport failure (DNS, connect, reset). Retryable.
    #[error("LLM transport failure: {detail}")]
    Network {
        /// Human-readable transport error description.
        detail: String,
    },

    /// The provider returned a 5xx status. Retryable.
    #[error("LLM provider server error (status {status})")]
    Server {
        /// HTTP status code (500–599).
        status: u16,
    },

    /// The provider returned a 4xx status other than 429. Not retryable.
    #[error("LLM provider rejected the request (status {status}): {detail}")]
    Client {
        /// HTTP status code (400–499, excluding 429).
        status: u16,
        /// Body excerpt for diagnosis.
        detail: String,
    },

    /// The provider returned 429 without quota/billing markers.
    ///
    /// Never retried by the backoff loop; surfaced immediately with the
    /// optional `Retry-After` hint so the caller can decide.
    #[error("LLM rate limit exceeded")]
    RateLimited {
        /// `Retry-After` hint in seconds, when the provider supplied one.
        retry_after: Option<u64>,
    },

    /// The provider returned 429 with quota/billing markers. Not retryable;
    /// retrying cannot succeed until the account is changed.
    #[error("LLM quota exhausted: {detail}")]
    QuotaExhausted {
        /// Provider-supplied detail naming the quota/billing condition.
        detail: String,
    },

    /// The completion was empty or whitespace-only. Not retryable.
    #[error("empty completion from LLM")]
    EmptyCompletion,

    /// The provider response could not be decoded. Not retryable: an
    /// unclassifiable failure mode must not be masked by retries.
    #[error("invalid response from LLM provider: {detail}")]
    InvalidResponse {
        /// Decoding failure description.
        detail: String,
    },

    /// No prompt template exists for the requested (version, agent) pair.
    #[error("prompt template not found: {path}")]
    TemplateNotFound {
        /// Expected template path.
        path: String,
    },

    /// Template rendering failed (syntax error, undefined variable).
    #[error("prompt template error: {detail}")]
    Template {
        /// Rendering failure description.
        detail: String,
    },

    /// The gateway was constructed or invoked with invalid configuration.
    #[error("LLM gateway configuration error: {detail}")]
    Configuration {
        /// Configuration problem description.
        detail: String,
    },

    /// The retry budget was exhausted by consecutive retryable failures.
    ///
    /// Marked retryable (the terminal cause was transient); a terminal
    /// timeout is re-raised as [`LlmError::Timeout`] instead of this wrapper.
    #[error("LLM request failed after {attempts} attempts: {source}")]
    Exhausted {
        /// Total attempts made (`max_retries + 1`).
        attempts: u32,
        /// The last underlying failure.
        source: Box<LlmError>,
    },
}

impl LlmError {
    /// Returns the retry decision for this failure.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Timeout { .. } | Self::Network { .. } | Self::Server { .. } => {
                RetryPolicy::Retryable { after: None }
            }
            Self::Exhausted { .. } => RetryPolicy::Retryable { after: None },
            Self::RateLimited { .. }
            | Self::QuotaExhausted { .. }
            | Self::Client { .. }
            | Self::EmptyCompletion
            | Self::InvalidResponse { .. }
            | Self::TemplateNotFound { .. }
            | Self::Template { .. }
            | Self::Configuration { .. } => RetryPolicy::NonRetryable,
        }
    }

    /// Returns `true` for timeout-class failures (directly or after
    /// exhaustion of a timeout sequence).
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Exhausted { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Returns the rate-limit `Retry-After` hint, when this failure carries one.
    pub fn retry_after_hint(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            Self::Exhausted { source, .. } => source.retry_after_hint(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Agent-level errors
// ---------------------------------------------------------------------------

/// A failure attributed to one pipeline step.
///
/// Agents never swallow errors: every failure mode propagates upward typed
/// and attributed, and a single agent failure aborts the entire request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    /// A required upstream output slot was never populated. Never retried.
    #[error("{agent} requires {dependency} output, which is not present in state")]
    MissingDependency {
        /// Agent that required the input.
        agent: AgentName,
        /// The upstream agent whose slot is empty.
        dependency: AgentName,
    },

    /// The gateway call failed after internal retries.
    #[error("{agent} LLM call failed: {source}")]
    Llm {
        /// Agent whose call failed.
        agent: AgentName,
        /// Classified transport failure.
        source: LlmError,
    },

    /// The completion was not parseable JSON (after fence stripping).
    #[error("{agent} produced malformed output: {detail}. Response: {excerpt}")]
    MalformedOutput {
        /// Agent whose output was malformed.
        agent: AgentName,
        /// Parse failure description.
        detail: String,
        /// Truncated raw response for diagnosis.
        excerpt: String,
    },

    /// Well-formed JSON that violated structural or range constraints.
    /// Never partially accepted.
    #[error("{agent} output failed validation: {message}")]
    Validation {
        /// Agent whose output failed validation.
        agent: AgentName,
        /// Violation description (includes whether a repair was attempted).
        message: String,
    },
}

impl AgentError {
    /// Returns the agent this failure is attributed to.
    pub fn agent(&self) -> AgentName {
        match self {
            Self::MissingDependency { agent, .. }
            | Self::Llm { agent, .. }
            | Self::MalformedOutput { agent, .. }
            | Self::Validation { agent, .. } => *agent,
        }
    }

    /// Returns the underlying transport failure, when this is an LLM failure.
    pub fn llm_source(&self) -> Option<&LlmError> {
        match self {
            Self::Llm { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline-level errors
// ---------------------------------------------------------------------------

/// The orchestrator's wrapper around any step failure.
///
/// Adds the request id and, where known, the failing agent's name. The
/// orchestrator never retries at the pipeline level and never returns a
/// partial response.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// An agent failed; remaining steps were aborted.
    #[error("pipeline failed for request {request_id}: {source}")]
    Agent {
        /// Request being processed.
        request_id: RequestId,
        /// The failing agent.
        agent: AgentName,
        /// The attributed failure.
        source: AgentError,
    },

    /// A state-slot invariant was violated while recording an output.
    #[error("pipeline state error for request {request_id}: {source}")]
    State {
        /// Request being processed.
        request_id: RequestId,
        /// The violated invariant.
        source: StateError,
    },
}

impl PipelineError {
    /// Returns the request this failure belongs to.
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::Agent { request_id, .. } | Self::State { request_id, .. } => *request_id,
        }
    }

    /// Returns the failing agent's name, when the failure is attributable.
    pub fn agent(&self) -> Option<AgentName> {
        match self {
            Self::Agent { agent, .. } => Some(*agent),
            Self::State { .. } => None,
        }
    }

    /// Returns the agent-level failure, when present.
    pub fn agent_error(&self) -> Option<&AgentError> {
        match self {
            Self::Agent { source, .. } => Some(source),
            Self::State { .. } => None,
        }
    }
}
