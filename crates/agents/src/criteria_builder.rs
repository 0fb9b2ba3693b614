//! Criteria Builder agent: converts vague goals into weighted criteria.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use pipeline::{
    normalize_weights, AgentError, AgentName, AgentOutput, CriteriaOutput, LanguageModel,
    PipelineState, RawCriterion,
};

use crate::agent::Agent;
use crate::json::{json_string, optional_json_string, parse_agent_json};
use crate::validation::ValidationService;

const NAME: AgentName = AgentName::CriteriaBuilder;

/// Wire form of the model's criteria list, before weight normalization.
#[derive(Debug, Deserialize)]
struct CriteriaWire {
    criteria: Vec<RawCriterion>,
}

/// The second pipeline step. Generates a non-empty criteria list with
/// arbitrary model-chosen weights, then deterministically renormalizes them
/// to sum to 1.0 (equal `1/n` distribution when every raw weight is zero).
pub struct CriteriaBuilder {
    model: Arc<dyn LanguageModel>,
    validation: Arc<ValidationService>,
}

impl CriteriaBuilder {
    /// Creates the agent with its model and validation collaborators.
    pub fn new(model: Arc<dyn LanguageModel>, validation: Arc<ValidationService>) -> Self {
        Self { model, validation }
    }
}

#[async_trait]
impl Agent for CriteriaBuilder {
    fn name(&self) -> AgentName {
        NAME
    }

    async fn execute(&self, state: &PipelineState) -> Result<AgentOutput, AgentError> {
        let input = state.input();
        let vars = json!({
            "decision_context": input.decision_context.as_str(),
            "options": json_string(NAME, &input.options)?,
            "constraints": optional_json_string(NAME, &input.constraints)?,
            "criteria_preferences": optional_json_string(NAME, &input.criteria_preferences)?,
        });

        let raw = self
            .model
            .complete_with_template(NAME, &vars)
            .await
            .map_err(|source| AgentError::Llm { agent: NAME, source })?;

        let value = parse_agent_json(NAME, &raw)?;
        let value = self
            .validation
            .validate(NAME, &value)
            .await
            .map_err(|err| AgentError::Validation {
                agent: NAME,
                message: err.to_string(),
            })?;

        let wire: CriteriaWire =
            serde_json::from_value(value).map_err(|err| AgentError::Validation {
                agent: NAME,
                message: err.to_string(),
            })?;

        let criteria = normalize_weights(wire.criteria).map_err(|err| AgentError::Validation {
            agent: NAME,
            message: format!("weight normalization failed: {err}"),
        })?;

        debug!(criteria = criteria.len(), "criteria builder completed");
        Ok(AgentOutput::Criteria(CriteriaOutput { criteria }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_state, ScriptedModel};

    fn agent(model: ScriptedModel) -> CriteriaBuilder {
        let model: Arc<dyn LanguageModel> = Arc::new(model);
        let validation = Arc::new(ValidationService::without_repair(Arc::clone(&model)));
        CriteriaBuilder::new(model, validation)
    }

    #[tokio::test]
    async fn normalizes_model_weights() {
        let model = ScriptedModel::returning(|_, _| {
            Ok(r#"{
                "criteria": [
                    {"name": "cost", "weight": 2.0, "rationale": "Cost matters"},
                    {"name": "time", "weight": 6.0, "rationale": "Time matters"}
                ]
            }"#
            .to_string())
        });
        let output = agent(model).execute(&test_state()).await.unwrap();
        match output {
            AgentOutput::Criteria(out) => {
                let sum: f64 = out.criteria.iter().map(|c| c.weight.as_f64()).sum();
                assert!((sum - 1.0).abs() < 1e-3);
                assert!((out.criteria.weight_for("cost").unwrap().as_f64() - 0.25).abs() < 1e-9);
            }
            other => panic!("wrong output kind: {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_weights_distribute_equally() {
        let model = ScriptedModel::returning(|_, _| {
            Ok(r#"{
                "criteria": [
                    {"name": "a", "weight": 0.0, "rationale": "r"},
                    {"name": "b", "weight": 0.0, "rationale": "r"}
                ]
            }"#
            .to_string())
        });
        let output = agent(model).execute(&test_state()).await.unwrap();
        match output {
            AgentOutput::Criteria(out) => {
                for criterion in out.criteria.iter() {
                    assert!((criterion.weight.as_f64() - 0.5).abs() < 1e-9);
                }
            }
            other => panic!("wrong output kind: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_criteria_list_fails_validation() {
        let model = ScriptedModel::returning(|_, _| Ok(r#"{"criteria": []}"#.to_string()));
        let err = agent(model).execute(&test_state()).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation { agent, .. } if agent == NAME));
    }

    #[tokio::test]
    async fn negative_weight_fails_validation() {
        let model = ScriptedModel::returning(|_, _| {
            Ok(r#"{"criteria": [{"name": "a", "weight": -1.0, "rationale": "r"}]}"#.to_string())
        });
        let err = agent(model).execute(&test_state()).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation { agent, .. } if agent == NAME));
    }
}
