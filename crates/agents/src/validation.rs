//! Agent-output schema validation with one-shot LLM repair.
//!
//! Each agent's output schema is embedded at compile time and checked with
//! `jsonschema`. On failure the service may attempt exactly one repair
//! round-trip: the invalid payload, the target schema, and the violation
//! list are rendered into the `repair` prompt, the completion is parsed, and
//! the result is re-validated. A second failure is terminal and reported
//! distinctly from an unattempted-repair failure.

use std::sync::Arc;

use jsonschema::validator_for;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use pipeline::{AgentName, LanguageModel};

use crate::json::{excerpt, strip_code_fences};

const CLARIFIER_SCHEMA: &str = include_str!("../schemas/clarifier_output.schema.json");
const CRITERIA_BUILDER_SCHEMA: &str = include_str!("../schemas/criteria_builder_output.schema.json");
const BIAS_CHECKER_SCHEMA: &str = include_str!("../schemas/bias_checker_output.schema.json");
const OPTION_EVALUATOR_SCHEMA: &str = include_str!("../schemas/option_evaluator_output.schema.json");
const DECISION_SYNTHESIZER_SCHEMA: &str =
    include_str!("../schemas/decision_synthesizer_output.schema.json");

/// Characters of invalid payload forwarded to the repair prompt.
const REPAIR_PAYLOAD_LEN: usize = 2_000;

/// A schema-validation failure, distinguishing whether repair was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Validation failed and no repair was attempted.
    #[error("schema validation failed for {agent}: {errors:?}")]
    Failed {
        /// Agent whose output failed.
        agent: AgentName,
        /// Schema violation messages.
        errors: Vec<String>,
    },

    /// Validation failed, one repair round-trip ran, and the repaired
    /// payload still failed.
    #[error("schema validation failed after repair attempt for {agent}: {errors:?}")]
    FailedAfterRepair {
        /// Agent whose output failed.
        agent: AgentName,
        /// Violations found in the repaired payload.
        errors: Vec<String>,
    },

    /// The repair round-trip itself could not produce a candidate payload.
    #[error("schema repair unavailable for {agent}: {detail}")]
    RepairUnavailable {
        /// Agent whose output was being repaired.
        agent: AgentName,
        /// Why the repair attempt produced nothing to re-validate.
        detail: String,
    },

    /// The embedded schema could not be compiled. Indicates a build defect,
    /// not bad model output.
    #[error("embedded schema for {agent} is invalid: {detail}")]
    InvalidSchema {
        /// Agent the schema belongs to.
        agent: AgentName,
        /// Compilation failure description.
        detail: String,
    },
}

/// Validates agent outputs against their JSON Schemas, optionally repairing
/// invalid payloads through one LLM round-trip.
pub struct ValidationService {
    model: Arc<dyn LanguageModel>,
    repair_enabled: bool,
}

impl ValidationService {
    /// Creates a service with one-shot repair enabled.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            repair_enabled: true,
        }
    }

    /// Creates a service that reports failures without attempting repair.
    pub fn without_repair(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            repair_enabled: false,
        }
    }

    /// Validates `payload` against the output schema for `agent`.
    ///
    /// Returns the payload that ultimately passed validation — the original,
    /// or the repaired one after a successful repair round-trip.
    pub async fn validate(
        &self,
        agent: AgentName,
        payload: &Value,
    ) -> Result<Value, ValidationError> {
        let errors = check(agent, payload)?;
        if errors.is_empty() {
            return Ok(payload.clone());
        }

        if !self.repair_enabled {
            return Err(ValidationError::Failed { agent, errors });
        }

        warn!(agent = %agent, violations = errors.len(), "agent output failed schema validation; attempting repair");
        let repaired = self.repair(agent, payload, &errors).await?;
        let second = check(agent, &repaired)?;
        if second.is_empty() {
            debug!(agent = %agent, "schema repair succeeded");
            return Ok(repaired);
        }
        Err(ValidationError::FailedAfterRepair {
            agent,
            errors: second,
        })
    }

    /// One repair round-trip: render the repair prompt, complete, parse.
    async fn repair(
        &self,
        agent: AgentName,
        payload: &Value,
        errors: &[String],
    ) -> Result<Value, ValidationError> {
        let unavailable = |detail: String| ValidationError::RepairUnavailable { agent, detail };

        let invalid_json = serde_json::to_string(payload).map_err(|err| unavailable(err.to_string()))?;
        let schema_value = schema_value(agent)?;
        let schema_text =
            serde_json::to_string_pretty(&schema_value).map_err(|err| unavailable(err.to_string()))?;
        let errors_text =
            serde_json::to_string(errors).map_err(|err| unavailable(err.to_string()))?;

        let vars = json!({
            "agent_name": agent.as_str(),
            "invalid_json": excerpt(&invalid_json, REPAIR_PAYLOAD_LEN),
            "json_schema": schema_text,
            "validation_errors": errors_text,
        });

        let raw = self
            .model
            .complete_with_template(AgentName::Repair, &vars)
            .await
            .map_err(|err| unavailable(format!("repair LLM call failed: {err}")))?;

        serde_json::from_str(strip_code_fences(&raw))
            .map_err(|err| unavailable(format!("repair response is not valid JSON: {err}")))
    }
}

/// Returns the schema violations for `payload`, empty when valid.
fn check(agent: AgentName, payload: &Value) -> Result<Vec<String>, ValidationError> {
    let schema = schema_value(agent)?;
    let validator = validator_for(&schema).map_err(|err| ValidationError::InvalidSchema {
        agent,
        detail: err.to_string(),
    })?;
    if validator.is_valid(payload) {
        return Ok(Vec::new());
    }
    Ok(validator
        .iter_errors(payload)
        .map(|err| err.to_string())
        .collect())
}

/// Parses the embedded schema document for `agent`.
fn schema_value(agent: AgentName) -> Result<Value, ValidationError> {
    let source = match agent {
        AgentName::Clarifier => CLARIFIER_SCHEMA,
        AgentName::CriteriaBuilder => CRITERIA_BUILDER_SCHEMA,
        AgentName::BiasChecker => BIAS_CHECKER_SCHEMA,
        AgentName::OptionEvaluator => OPTION_EVALUATOR_SCHEMA,
        AgentName::DecisionSynthesizer => DECISION_SYNTHESIZER_SCHEMA,
        AgentName::Repair => {
            return Err(ValidationError::InvalidSchema {
                agent,
                detail: "no output schema is registered for the repair prompt".to_string(),
            })
        }
    };
    serde_json::from_str(source).map_err(|err| ValidationError::InvalidSchema {
        agent,
        detail: err.to_string(),
    })
}
