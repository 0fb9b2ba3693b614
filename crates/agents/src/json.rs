//! JSON handling for model completions.
//!
//! Completions frequently arrive wrapped in markdown code fences; stripping
//! happens here, once, before parsing. Malformed JSON carries a truncated
//! excerpt of the raw response for diagnosis.

use serde::Serialize;
use serde_json::Value;

use pipeline::{AgentError, AgentName};

/// Characters of raw response retained in malformed-output diagnostics.
const EXCERPT_LEN: usize = 200;

/// Strips optional surrounding markdown code fences (with an optional
/// `json` language tag) from a completion.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parses a completion as JSON after fence stripping.
///
/// Failure is fatal and attributed to `agent`, with a truncated excerpt of
/// the raw (unstripped) response.
pub fn parse_agent_json(agent: AgentName, raw: &str) -> Result<Value, AgentError> {
    serde_json::from_str(strip_code_fences(raw)).map_err(|err| AgentError::MalformedOutput {
        agent,
        detail: err.to_string(),
        excerpt: excerpt(raw, EXCERPT_LEN),
    })
}

/// Serializes a prompt variable to its JSON text form.
pub fn json_string<T: Serialize + ?Sized>(agent: AgentName, value: &T) -> Result<String, AgentError> {
    serde_json::to_string(value).map_err(|err| AgentError::Validation {
        agent,
        message: format!("failed to serialize prompt variables: {err}"),
    })
}

/// Serializes an optional prompt variable, substituting the literal `None`
/// when absent so templates always receive a value.
pub fn optional_json_string<T: Serialize>(
    agent: AgentName,
    value: &Option<T>,
) -> Result<String, AgentError> {
    match value {
        Some(inner) => json_string(agent, inner),
        None => Ok("None".to_string()),
    }
}

/// Truncates text to `max` characters on a character boundary.
pub(crate) fn excerpt(raw: &str, max: usize) -> String {
    raw.chars().take(max).collect()
}
