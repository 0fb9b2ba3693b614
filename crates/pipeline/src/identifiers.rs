//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct
//! newtype wrapping a primitive. This prevents accidentally interchanging —
//! for example — a [`LogicVersion`] with a [`SchemaVersion`] even though both
//! are strings under the hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single decision-analysis request.
///
/// Generated fresh for every request (or adopted from the caller's
/// `X-Request-ID` header) and propagated through the pipeline state, spans,
/// the final response, and every error envelope so all activity from one
/// request can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a new random request identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`RequestId`] from an existing UUID (e.g. parsed from a header).
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed (configuration)
// ---------------------------------------------------------------------------

string_id! {
    /// The API contract version exposed to callers (e.g. `"v1"`).
    ApiVersion
}

string_id! {
    /// The prompt-bundle version (e.g. `"v1.0.0"`).
    ///
    /// Selects which `prompts/<version>/` directory governs agent behaviour.
    /// Swapping the logic version changes prompt text without touching code.
    LogicVersion
}

string_id! {
    /// The JSON schema version (e.g. `"v1.0.0"`), tracked for compatibility.
    SchemaVersion
}

// ---------------------------------------------------------------------------
// Agent names
// ---------------------------------------------------------------------------

/// Identifies one agent of the pipeline by its stable snake_case name.
///
/// The name doubles as the prompt-template lookup key
/// (`prompts/<version>/<name>.txt`) and the attribution tag carried by every
/// agent-level failure. [`AgentName::Repair`] is not a pipeline step; it
/// names the schema-repair prompt used by the validation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentName {
    /// Identifies missing inputs and asks essential questions.
    Clarifier,
    /// Converts vague goals into weighted evaluation criteria.
    CriteriaBuilder,
    /// Detects and names specific cognitive biases.
    BiasChecker,
    /// Scores every option against every criterion.
    OptionEvaluator,
    /// Produces the final recommendation with confidence scoring.
    DecisionSynthesizer,
    /// Schema-repair prompt (not a pipeline step).
    Repair,
}

/// The fixed execution order of the pipeline.
///
/// The sequence is data: adding, removing, or reordering a step is a change
/// to this array, not a control-flow rewrite.
pub const PIPELINE_ORDER: [AgentName; 5] = [
    AgentName::Clarifier,
    AgentName::CriteriaBuilder,
    AgentName::BiasChecker,
    AgentName::OptionEvaluator,
    AgentName::DecisionSynthesizer,
];

impl AgentName {
    /// Returns the stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clarifier => "clarifier",
            Self::CriteriaBuilder => "criteria_builder",
            Self::BiasChecker => "bias_checker",
            Self::OptionEvaluator => "option_evaluator",
            Self::DecisionSynthesizer => "decision_synthesizer",
            Self::Repair => "repair",
        }
    }

    /// Returns the agent that must have completed immediately before this
    /// one, or `None` for the first pipeline step and for [`Self::Repair`].
    pub fn predecessor(self) -> Option<AgentName> {
        match self {
            Self::Clarifier | Self::Repair => None,
            Self::CriteriaBuilder => Some(Self::Clarifier),
            Self::BiasChecker => Some(Self::CriteriaBuilder),
            Self::OptionEvaluator => Some(Self::BiasChecker),
            Self::DecisionSynthesizer => Some(Self::OptionEvaluator),
        }
    }
}

impl std::fmt::Display for AgentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_order_is_the_five_agents() {
        assert_eq!(PIPELINE_ORDER.len(), 5);
        assert_eq!(PIPELINE_ORDER[0], AgentName::Clarifier);
        assert_eq!(PIPELINE_ORDER[4], AgentName::DecisionSynthesizer);
        assert!(!PIPELINE_ORDER.contains(&AgentName::Repair));
    }

    #[test]
    fn predecessors_follow_pipeline_order() {
        for pair in PIPELINE_ORDER.windows(2) {
            assert_eq!(pair[1].predecessor(), Some(pair[0]));
        }
        assert_eq!(AgentName::Clarifier.predecessor(), None);
    }

    #[test]
    fn version_identifiers_reject_empty_values() {
        assert!(LogicVersion::new("").is_none());
        assert!(ApiVersion::new("v1").is_some());
    }

    #[test]
    fn agent_name_serialises_as_snake_case() {
        let json = serde_json::to_string(&AgentName::CriteriaBuilder).unwrap();
        assert_eq!(json, "\"criteria_builder\"");
    }
}
