//! Typed agent outputs.
//!
//! Each pipeline step produces exactly one of these value objects. The
//! executor performs the single authoritative parse/validate step per slot;
//! downstream agents consume the typed structures directly rather than
//! re-validating loose maps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AgentName, BiasFinding, Confidence, ConfidenceBreakdown, CriteriaSet, OptionScores};

/// Output of the Clarifier: gaps in the caller's input.
///
/// Both lists may be empty. A non-empty output signals "needs more
/// information" but does not halt the pipeline; the signal is advisory and
/// is carried through state so callers can surface the questions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarifierOutput {
    /// Required input fields the Clarifier considers missing.
    pub missing_fields: Vec<String>,
    /// Questions that would gather the missing information.
    pub questions: Vec<String>,
}

impl ClarifierOutput {
    /// Returns `true` when the Clarifier identified gaps in the input.
    pub fn needs_more_information(&self) -> bool {
        !self.missing_fields.is_empty() || !self.questions.is_empty()
    }
}

/// Output of the Criteria Builder: a normalized, sum-to-one criteria set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaOutput {
    /// Weighted evaluation criteria; weights sum to 1.0 within tolerance.
    pub criteria: CriteriaSet,
}

/// Output of the Bias Checker: zero or more canonicalized findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiasReport {
    /// Detected cognitive biases.
    pub findings: Vec<BiasFinding>,
}

/// Output of the Option Evaluator: one [`OptionScores`] per input option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Scores keyed by option name; one entry per input option.
    pub scores: BTreeMap<String, OptionScores>,
}

/// Output of the Decision Synthesizer: the final verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOutput {
    /// Recommended option; validated to be one of the input options.
    pub winner: String,
    /// Overall confidence in the recommendation.
    pub confidence: Confidence,
    /// Confidence broken down by factor; all four factors mandatory.
    pub confidence_breakdown: ConfidenceBreakdown,
    /// Trade-offs between options.
    pub trade_offs: Vec<Value>,
    /// Documented assumptions.
    pub assumptions: Vec<String>,
    /// Factors that would change the recommendation.
    pub what_would_change_decision: Vec<String>,
}

// ---------------------------------------------------------------------------

/// Tagged union over the five agent outputs.
///
/// Lets the executor drive a uniform descriptor loop: every agent returns an
/// [`AgentOutput`], and [`crate::PipelineState::record`] routes it into the
/// matching slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentOutput {
    /// Clarifier result.
    Clarifier(ClarifierOutput),
    /// Criteria Builder result.
    Criteria(CriteriaOutput),
    /// Bias Checker result.
    Biases(BiasReport),
    /// Option Evaluator result.
    Evaluation(EvaluationReport),
    /// Decision Synthesizer result.
    Synthesis(SynthesisOutput),
}

impl AgentOutput {
    /// Returns the name of the agent that produces this output kind.
    pub fn agent(&self) -> AgentName {
        match self {
            Self::Clarifier(_) => AgentName::Clarifier,
            Self::Criteria(_) => AgentName::CriteriaBuilder,
            Self::Biases(_) => AgentName::BiasChecker,
            Self::Evaluation(_) => AgentName::OptionEvaluator,
            Self::Synthesis(_) => AgentName::DecisionSynthesizer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clarifier_output_flags_gaps() {
        let clean = ClarifierOutput::default();
        assert!(!clean.needs_more_information());

        let gappy = ClarifierOutput {
            missing_fields: vec!["budget".to_string()],
            questions: Vec::new(),
        };
        assert!(gappy.needs_more_information());
    }

    #[test]
    fn output_kinds_name_their_agents() {
        let output = AgentOutput::Clarifier(ClarifierOutput::default());
        assert_eq!(output.agent(), AgentName::Clarifier);

        let output = AgentOutput::Biases(BiasReport::default());
        assert_eq!(output.agent(), AgentName::BiasChecker);
    }
}
