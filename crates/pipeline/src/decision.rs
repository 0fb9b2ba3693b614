//! Request and response contracts for one decision analysis.
//!
//! [`DecisionRequest`] is validated on receipt (option count, context
//! length); [`DecisionResponse`] is the terminal, immutable artifact built
//! once as a pure projection of the final pipeline state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    BiasFinding, Confidence, ConfidenceBreakdown, CriteriaSet, OptionScores, RequestId,
    VersionMetadata,
};

/// Minimum number of characters in a decision context.
pub const MIN_CONTEXT_LEN: usize = 10;
/// Maximum number of characters in a decision context.
pub const MAX_CONTEXT_LEN: usize = 10_000;
/// Minimum number of options in a request.
pub const MIN_OPTIONS: usize = 2;
/// Maximum number of options in a request.
pub const MAX_OPTIONS: usize = 20;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A decision-analysis request as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecisionRequest {
    /// Problem description and decision context.
    pub decision_context: String,

    /// Options to evaluate (2–20 non-empty names).
    pub options: Vec<String>,

    /// Optional constraints (budget, timeline, etc.).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Map<String, Value>>,

    /// Optional caller-specified criteria preferences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_preferences: Option<Vec<String>>,

    /// Additional free-form context metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_metadata: Option<Map<String, Value>>,
}

impl DecisionRequest {
    /// Validates the request bounds, returning the first violation found.
    pub fn validate(&self) -> Result<(), RequestValidationError> {
        let context_len = self.decision_context.chars().count();
        if context_len < MIN_CONTEXT_LEN {
            return Err(RequestValidationError::ContextTooShort { len: context_len });
        }
        if context_len > MAX_CONTEXT_LEN {
            return Err(RequestValidationError::ContextTooLong { len: context_len });
        }
        if self.options.len() < MIN_OPTIONS {
            return Err(RequestValidationError::TooFewOptions {
                count: self.options.len(),
            });
        }
        if self.options.len() > MAX_OPTIONS {
            return Err(RequestValidationError::TooManyOptions {
                count: self.options.len(),
            });
        }
        if let Some(index) = self.options.iter().position(|o| o.trim().is_empty()) {
            return Err(RequestValidationError::EmptyOption { index });
        }
        Ok(())
    }
}

/// A violation of the request bounds, detected on receipt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestValidationError {
    /// The decision context is shorter than [`MIN_CONTEXT_LEN`] characters.
    #[error("decision_context too short: {len} characters (minimum {MIN_CONTEXT_LEN})")]
    ContextTooShort {
        /// Observed character count.
        len: usize,
    },

    /// The decision context is longer than [`MAX_CONTEXT_LEN`] characters.
    #[error("decision_context too long: {len} characters (maximum {MAX_CONTEXT_LEN})")]
    ContextTooLong {
        /// Observed character count.
        len: usize,
    },

    /// Fewer than [`MIN_OPTIONS`] options were supplied.
    #[error("too few options: {count} (minimum {MIN_OPTIONS})")]
    TooFewOptions {
        /// Observed option count.
        count: usize,
    },

    /// More than [`MAX_OPTIONS`] options were supplied.
    #[error("too many options: {count} (maximum {MAX_OPTIONS})")]
    TooManyOptions {
        /// Observed option count.
        count: usize,
    },

    /// An option name is empty or whitespace-only.
    #[error("option at index {index} is empty")]
    EmptyOption {
        /// Zero-based index of the offending option.
        index: usize,
    },
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// The terminal artifact of a successful pipeline run.
///
/// Every field is a projection of the final pipeline state: the normalized
/// input plus each agent's recorded output. The response is built exactly
/// once, after all five agents have succeeded; it is never partially
/// emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    /// Echo of the decision context.
    pub decision: String,
    /// Options that were evaluated.
    pub options: Vec<String>,
    /// Evaluation criteria with normalized weights.
    pub criteria: CriteriaSet,
    /// Scores per option (key = option name).
    pub scores: BTreeMap<String, OptionScores>,
    /// Recommended option; always a member of `options`.
    pub winner: String,
    /// Overall confidence in the recommendation.
    pub confidence: Confidence,
    /// Confidence broken down by factor.
    pub confidence_breakdown: ConfidenceBreakdown,
    /// Detected cognitive biases, kept separate from the recommendation.
    pub biases_detected: Vec<BiasFinding>,
    /// Trade-offs between options, as reported by the synthesizer.
    pub trade_offs: Vec<Value>,
    /// Documented assumptions.
    pub assumptions: Vec<String>,
    /// Identified risks. Always empty in this version; the slot is reserved
    /// in the contract.
    pub risks: Vec<Value>,
    /// Factors that would change the recommendation.
    pub what_would_change_decision: Vec<String>,
    /// Version metadata for the producing pipeline.
    pub meta: VersionMetadata,
    /// Request identifier for correlation.
    pub request_id: RequestId,
}
