//! Clarifier agent: identifies missing inputs and asks essential questions.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use pipeline::{
    AgentError, AgentName, AgentOutput, ClarifierOutput, LanguageModel, PipelineState,
};

use crate::agent::Agent;
use crate::json::{json_string, optional_json_string, parse_agent_json};
use crate::validation::ValidationService;

const NAME: AgentName = AgentName::Clarifier;

/// The first pipeline step. Analyzes the decision request and returns
/// structured questions for any missing context. Its signal is advisory:
/// downstream agents run regardless, and the questions travel in state for
/// the caller to surface.
pub struct Clarifier {
    model: Arc<dyn LanguageModel>,
    validation: Arc<ValidationService>,
}

impl Clarifier {
    /// Creates the agent with its model and validation collaborators.
    pub fn new(model: Arc<dyn LanguageModel>, validation: Arc<ValidationService>) -> Self {
        Self { model, validation }
    }
}

#[async_trait]
impl Agent for Clarifier {
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

        let output: ClarifierOutput =
            serde_json::from_value(value).map_err(|err| AgentError::Validation {
                agent: NAME,
                message: err.to_string(),
            })?;

        debug!(
            missing_fields = output.missing_fields.len(),
            questions = output.questions.len(),
            "clarifier completed"
        );
        Ok(AgentOutput::Clarifier(output))
    }
}
