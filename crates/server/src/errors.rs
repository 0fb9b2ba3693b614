//! Transport error envelope.
//!
//! Maps the core's typed failures onto HTTP status codes and
//! machine-readable error codes. This mapping is deliberately a transport
//! concern: the core crates know nothing about HTTP.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use pipeline::{AgentError, PipelineError, RequestId, RequestValidationError};

/// Machine-readable error categories exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The request body violated the request contract.
    InvalidRequest,
    /// An agent output failed schema or range validation.
    SchemaValidationFailed,
    /// An LLM call timed out (after retries).
    AgentTimeout,
    /// The LLM provider rate limit was hit.
    RateLimitExceeded,
    /// The LLM provider quota is exhausted.
    QuotaExceeded,
    /// The pipeline failed for another reason.
    PipelineError,
    /// An unexpected internal failure.
    InternalError,
}

/// Error payload inside the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable category.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Structured context (failing agent, violation list, …).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// The standardized error envelope; always carries the request id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error information.
    pub error: ErrorDetail,
    /// Request identifier for correlation.
    pub request_id: RequestId,
}

/// A fully classified transport error, ready to render.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status this error renders with.
    pub status: StatusCode,
    /// Machine-readable category.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Structured context (failing agent, violation list, …).
    pub details: Option<Value>,
    /// Rate-limit retry hint, echoed as a `Retry-After` header.
    pub retry_after: Option<u64>,
    /// Request identifier for correlation.
    pub request_id: RequestId,
}

impl ApiError {
    /// Classifies a request-contract violation (400).
    pub fn invalid_request(request_id: RequestId, err: &RequestValidationError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: ErrorCode::InvalidRequest,
            message: err.to_string(),
            details: None,
            retry_after: None,
            request_id,
        }
    }

    /// Classifies a pipeline failure into status, code, and details.
    pub fn from_pipeline(err: &PipelineError) -> Self {
        let request_id = err.request_id();
        let (status, code, retry_after) = classify(err);
        let details = err.agent().map(|agent| json!({ "agent": agent.as_str() }));
        Self {
            status,
            code,
            message: err.to_string(),
            details,
            retry_after,
            request_id,
        }
    }
}

/// Failure-kind → (status, code, retry hint) mapping.
fn classify(err: &PipelineError) -> (StatusCode, ErrorCode, Option<u64>) {
    let Some(agent_error) = err.agent_error() else {
        return (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError, None);
    };
    match agent_error {
        AgentError::Llm { source, .. } => {
            if source.is_timeout() {
                return (StatusCode::GATEWAY_TIMEOUT, ErrorCode::AgentTimeout, None);
            }
            if let Some(hint) = source.retry_after_hint() {
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    ErrorCode::RateLimitExceeded,
                    Some(hint),
                );
            }
            match source {
                pipeline::LlmError::RateLimited { .. } => (
                    StatusCode::TOO_MANY_REQUESTS,
                    ErrorCode::RateLimitExceeded,
                    None,
                ),
                pipeline::LlmError::QuotaExhausted { .. } => {
                    (StatusCode::TOO_MANY_REQUESTS, ErrorCode::QuotaExceeded, None)
                }
                _ => (StatusCode::BAD_GATEWAY, ErrorCode::PipelineError, None),
            }
        }
        AgentError::Validation { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::SchemaValidationFailed,
            None,
        ),
        AgentError::MalformedOutput { .. } => {
            (StatusCode::BAD_GATEWAY, ErrorCode::PipelineError, None)
        }
        AgentError::MissingDependency { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError, None)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = ErrorResponse {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
            },
            request_id: self.request_id,
        };
        let mut response = (self.status, Json(envelope)).into_response();
        if let Some(seconds) = self.retry_after {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
