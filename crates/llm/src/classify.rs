//! The single error-classification point at the gateway boundary.
//!
//! Every failure leaving the gateway is one of the closed [`LlmError`]
//! variants; downstream logic consults [`LlmError::retry_policy`] and never
//! re-inspects status codes, headers, or provider message text.

use serde_json::Value;

use pipeline::LlmError;

/// Body substrings that mark a 429 as a quota/billing condition rather than
/// a transient rate limit.
const QUOTA_MARKERS: [&str; 3] = ["insufficient_quota", "quota", "billing"];

/// Maximum number of characters of response body carried in error details.
const BODY_EXCERPT_LEN: usize = 200;

/// Classifies a non-success HTTP response.
///
/// 429 is split into quota exhaustion (error code or message markers) versus
/// a plain rate limit carrying the optional `Retry-After` hint. 5xx is a
/// retryable server error; any other 4xx is a non-retryable client error.
/// Statuses outside 4xx/5xx should not occur and classify as unclassifiable
/// (and therefore non-retryable) responses.
pub fn classify_http_failure(status: u16, retry_after: Option<u64>, body: &str) -> LlmError {
    match status {
        429 => classify_rate_limit(retry_after, body),
        500..=599 => LlmError::Server { status },
        400..=499 => LlmError::Client {
            status,
            detail: excerpt(body),
        },
        _ => LlmError::InvalidResponse {
            detail: format!("unexpected status {status}: {}", excerpt(body)),
        },
    }
}

/// Classifies a transport-level `reqwest` failure.
///
/// Timeouts and connection-class failures are retryable; anything else
/// (builder misuse, body decoding) is unclassifiable and fails fast so
/// unknown failure modes are never masked by retries.
pub fn classify_transport(error: &reqwest::Error, timeout_secs: u64) -> LlmError {
    if error.is_timeout() {
        return LlmError::Timeout {
            seconds: timeout_secs,
        };
    }
    if error.is_connect() || error.is_request() {
        return LlmError::Network {
            detail: error.to_string(),
        };
    }
    LlmError::InvalidResponse {
        detail: error.to_string(),
    }
}

/// Splits a 429 into quota exhaustion versus rate limit.
fn classify_rate_limit(retry_after: Option<u64>, body: &str) -> LlmError {
    let lowered = body.to_ascii_lowercase();
    let coded_as_quota = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("code"))
                .and_then(Value::as_str)
                .map(|code| code == "insufficient_quota")
        })
        .unwrap_or(false);

    if coded_as_quota || QUOTA_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return LlmError::QuotaExhausted {
            detail: excerpt(body),
        };
    }
    LlmError::RateLimited { retry_after }
}

/// Truncates a body to a diagnostic excerpt on a character boundary.
fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}
