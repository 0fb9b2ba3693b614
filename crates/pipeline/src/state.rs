//! Request-scoped pipeline state.
//!
//! One [`PipelineState`] exists per request, exclusively owned by the
//! executor for the request's lifetime. It is created with only the
//! normalized input populated, mutated exactly five times (one slot per
//! agent, strictly in pipeline order), and discarded after the response is
//! assembled. No two requests ever share a state instance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::trace;

use crate::{
    AgentName, AgentOutput, BiasReport, ClarifierOutput, CriteriaOutput, DecisionRequest,
    EvaluationReport, RequestId, SynthesisOutput, Timestamp, VersionMetadata,
};

// ---------------------------------------------------------------------------
// Normalized input
// ---------------------------------------------------------------------------

/// Sanitized, normalized caller input; immutable for the request lifetime.
///
/// Produced from a validated [`DecisionRequest`] by a pass-through
/// normalizer. The indirection keeps a seam where size limits, content
/// filtering, and redaction can be added without touching the agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedInput {
    /// Problem description and decision context.
    pub decision_context: String,
    /// Options to evaluate (2–20 non-empty names, validated on receipt).
    pub options: Vec<String>,
    /// Optional constraints (budget, timeline, etc.).
    pub constraints: Option<Map<String, Value>>,
    /// Optional caller-specified criteria preferences.
    pub criteria_preferences: Option<Vec<String>>,
    /// Additional free-form context metadata.
    pub context_metadata: Option<Map<String, Value>>,
}

impl NormalizedInput {
    /// Normalizes a validated request. Currently a structural pass-through.
    pub fn from_request(request: DecisionRequest) -> Self {
        Self {
            decision_context: request.decision_context,
            options: request.options,
            constraints: request.constraints,
            criteria_preferences: request.criteria_preferences,
            context_metadata: request.context_metadata,
        }
    }
}

// ---------------------------------------------------------------------------
// State errors
// ---------------------------------------------------------------------------

/// A violation of the state machine's slot invariants.
///
/// These indicate orchestration bugs (out-of-order execution, double
/// recording), not bad input, and abort the pipeline immediately.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// An output slot was recorded twice.
    #[error("output slot for {agent} is already populated")]
    SlotAlreadyPopulated {
        /// Agent whose slot was written twice.
        agent: AgentName,
    },

    /// An output slot was recorded before its predecessor's slot.
    #[error("cannot record {agent} output before {dependency} has completed")]
    RecordedOutOfOrder {
        /// Agent whose output was being recorded.
        agent: AgentName,
        /// The predecessor slot that is still empty.
        dependency: AgentName,
    },

    /// A slot required for response assembly was never populated.
    #[error("output slot for {agent} was never populated")]
    SlotMissing {
        /// Agent whose slot is empty.
        agent: AgentName,
    },
}

// ---------------------------------------------------------------------------
// Pipeline state
// ---------------------------------------------------------------------------

/// The single mutable record shared across all five agents for one request.
///
/// Identity, versioning, and the normalized input are immutable after
/// creation. The five output slots are populated through [`Self::record`],
/// which enforces the two slot invariants: a slot is written at most once,
/// and slot N+1 is never populated before slot N.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    request_id: RequestId,
    versions: VersionMetadata,
    input: NormalizedInput,
    started_at: Timestamp,

    clarifier: Option<ClarifierOutput>,
    criteria: Option<CriteriaOutput>,
    biases: Option<BiasReport>,
    evaluation: Option<EvaluationReport>,
    synthesis: Option<SynthesisOutput>,
}

impl PipelineState {
    /// Creates a fresh state with only the input fields populated.
    pub fn new(request_id: RequestId, versions: VersionMetadata, input: NormalizedInput) -> Self {
        Self {
            request_id,
            versions,
            input,
            started_at: Timestamp::now(),
            clarifier: None,
            criteria: None,
            biases: None,
            evaluation: None,
            synthesis: None,
        }
    }

    /// Returns the request identifier.
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the version metadata the request runs under.
    pub fn versions(&self) -> &VersionMetadata {
        &self.versions
    }

    /// Returns the normalized input.
    pub fn input(&self) -> &NormalizedInput {
        &self.input
    }

    /// Returns when this state was created.
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Returns the Clarifier's output, if recorded.
    pub fn clarifier(&self) -> Option<&ClarifierOutput> {
        self.clarifier.as_ref()
    }

    /// Returns the Criteria Builder's output, if recorded.
    pub fn criteria(&self) -> Option<&CriteriaOutput> {
        self.criteria.as_ref()
    }

    /// Returns the Bias Checker's output, if recorded.
    pub fn biases(&self) -> Option<&BiasReport> {
        self.biases.as_ref()
    }

    /// Returns the Option Evaluator's output, if recorded.
    pub fn evaluation(&self) -> Option<&EvaluationReport> {
        self.evaluation.as_ref()
    }

    /// Returns the Decision Synthesizer's output, if recorded.
    pub fn synthesis(&self) -> Option<&SynthesisOutput> {
        self.synthesis.as_ref()
    }

    /// Returns `true` if the slot for `agent` is populated.
    pub fn has_output(&self, agent: AgentName) -> bool {
        match agent {
            AgentName::Clarifier => self.clarifier.is_some(),
            AgentName::CriteriaBuilder => self.criteria.is_some(),
            AgentName::BiasChecker => self.biases.is_some(),
            AgentName::OptionEvaluator => self.evaluation.is_some(),
            AgentName::DecisionSynthesizer => self.synthesis.is_some(),
            AgentName::Repair => false,
        }
    }

    /// Records an agent output into its slot.
    ///
    /// Fails if the slot is already populated or if the producing agent's
    /// predecessor has not completed yet. Slots are never overwritten.
    pub fn record(&mut self, output: AgentOutput) -> Result<(), StateError> {
        let agent = output.agent();
        if self.has_output(agent) {
            return Err(StateError::SlotAlreadyPopulated { agent });
        }
        if let Some(dependency) = agent.predecessor() {
            if !self.has_output(dependency) {
                return Err(StateError::RecordedOutOfOrder { agent, dependency });
            }
        }
        match output {
            AgentOutput::Clarifier(out) => self.clarifier = Some(out),
            AgentOutput::Criteria(out) => self.criteria = Some(out),
            AgentOutput::Biases(out) => self.biases = Some(out),
            AgentOutput::Evaluation(out) => self.evaluation = Some(out),
            AgentOutput::Synthesis(out) => self.synthesis = Some(out),
        }
        trace!(request_id = %self.request_id, agent = %agent, "recorded agent output");
        Ok(())
    }
}
