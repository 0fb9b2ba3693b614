//! Core orchestration domain for DecisionFlow.
//!
//! This crate contains every domain concept, newtype identifier, shared
//! value type, scoring function, and cross-cutting error type used
//! throughout the decision pipeline. Infrastructure crates implement the
//! traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O
//! dependencies. It defines *what* is needed; infrastructure crates define
//! *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`RequestId`, versions, `AgentName`) |
//! | [`types`] | Shared value types (`Weight`, `Score`, `Criterion`, etc.) |
//! | [`decision`] | Request/response contracts |
//! | [`outputs`] | Typed per-agent output slots |
//! | [`state`] | The request-scoped pipeline state machine |
//! | [`scoring`] | Weight normalization and weighted aggregation |
//! | [`errors`] | Error taxonomy and retry-policy types |
//! | [`ports`] | The `LanguageModel` port trait |

pub mod decision;
pub mod errors;
pub mod identifiers;
pub mod outputs;
pub mod ports;
pub mod scoring;
pub mod state;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use decision::{
    DecisionRequest, DecisionResponse, RequestValidationError, MAX_CONTEXT_LEN, MAX_OPTIONS,
    MIN_CONTEXT_LEN, MIN_OPTIONS,
};
pub use errors::{AgentError, LlmError, PipelineError, RetryPolicy};
pub use identifiers::{AgentName, ApiVersion, LogicVersion, RequestId, SchemaVersion, PIPELINE_ORDER};
pub use outputs::{
    AgentOutput, BiasReport, ClarifierOutput, CriteriaOutput, EvaluationReport, SynthesisOutput,
};
pub use ports::{CompletionRequest, LanguageModel};
pub use scoring::{normalize_weights, weighted_total, RawCriterion, ScoringError};
pub use state::{NormalizedInput, PipelineState, StateError};
pub use types::{
    BiasFinding, BiasType, Confidence, ConfidenceBreakdown, CriteriaSet, Criterion, OptionScore,
    OptionScores, Score, Timestamp, VersionMetadata, Weight, ALLOWED_BIAS_TYPES,
    WEIGHT_SUM_TOLERANCE,
};
