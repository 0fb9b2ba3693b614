//! DecisionFlow agent contracts and pipeline executor.
//!
//! This crate provides the five agent implementations (Clarifier through
//! Decision Synthesizer), the schema validation/repair service that guards
//! every agent boundary, and the [`PipelineExecutor`] that drives the
//! fixed-order step loop.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Agents sequence calls between business logic in
//! the [`pipeline`] crate and the [`pipeline::LanguageModel`] port. They
//! contain no transport details and no domain rules of their own.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`agent`] | The uniform `Agent` trait |
//! | [`json`] | Fence stripping and completion parsing |
//! | [`validation`] | JSON-Schema validation with one-shot LLM repair |
//! | [`clarifier`] … [`decision_synthesizer`] | The five agent contracts |
//! | [`orchestrator`] | `PipelineExecutor` and response assembly |

pub mod agent;
pub mod bias_checker;
pub mod clarifier;
pub mod criteria_builder;
pub mod decision_synthesizer;
pub mod json;
pub mod option_evaluator;
pub mod orchestrator;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use agent::Agent;
pub use bias_checker::BiasChecker;
pub use clarifier::Clarifier;
pub use criteria_builder::CriteriaBuilder;
pub use decision_synthesizer::DecisionSynthesizer;
pub use json::{parse_agent_json, strip_code_fences};
pub use option_evaluator::OptionEvaluator;
pub use orchestrator::{assemble_response, PipelineExecutor};
pub use validation::{ValidationError, ValidationService};
