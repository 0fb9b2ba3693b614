//! Bias Checker agent: detects and names specific cognitive biases.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use pipeline::{
    AgentError, AgentName, AgentOutput, BiasFinding, BiasReport, BiasType, LanguageModel,
    PipelineState, ALLOWED_BIAS_TYPES,
};

use crate::agent::Agent;
use crate::json::{json_string, parse_agent_json};
use crate::validation::ValidationService;

const NAME: AgentName = AgentName::BiasChecker;

/// Wire form of one reported finding; `bias_type` arrives as free text and
/// is canonicalized against the closed enum.
#[derive(Debug, Deserialize)]
struct BiasFindingWire {
    bias_type: String,
    description: String,
    evidence: String,
}

#[derive(Debug, Deserialize)]
struct BiasWire {
    bias_findings: Vec<BiasFindingWire>,
}

/// The third pipeline step. Requires the Criteria Builder's output; analyzes
/// context, options, and criteria for cognitive biases. Zero findings is a
/// valid result; an unrecognized bias category is a fatal validation
/// failure, never silently dropped.
pub struct BiasChecker {
    model: Arc<dyn LanguageModel>,
    validation: Arc<ValidationService>,
}

impl BiasChecker {
    /// Creates the agent with its model and validation collaborators.
    pub fn new(model: Arc<dyn LanguageModel>, validation: Arc<ValidationService>) -> Self {
        Self { model, validation }
    }
}

#[async_trait]
impl Agent for BiasChecker {
    fn name(&self) -> AgentName {
        NAME
    }

    async fn execute(&self, state: &PipelineState) -> Result<AgentOutput, AgentError> {
        let criteria = state
            .criteria()
            .ok_or(AgentError::MissingDependency {
                agent: NAME,
                dependency: AgentName::CriteriaBuilder,
            })?;
        let input = state.input();

        let vars = json!({
            "decision_context": input.decision_context.as_str(),
            "options": json_string(NAME, &input.options)?,
            "criteria": json_string(NAME, criteria.criteria.as_slice())?,
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

        let wire: BiasWire = serde_json::from_value(value).map_err(|err| AgentError::Validation {
            agent: NAME,
            message: err.to_string(),
        })?;

        let mut findings = Vec::with_capacity(wire.bias_findings.len());
        for finding in wire.bias_findings {
            let bias_type =
                BiasType::parse(&finding.bias_type).ok_or_else(|| AgentError::Validation {
                    agent: NAME,
                    message: format!(
                        "invalid bias_type '{}'; must be one of: {:?}",
                        finding.bias_type, ALLOWED_BIAS_TYPES
                    ),
                })?;
            findings.push(BiasFinding {
                bias_type,
                description: finding.description,
                evidence: finding.evidence,
            });
        }

        debug!(findings = findings.len(), "bias checker completed");
        Ok(AgentOutput::Biases(BiasReport { findings }))
    }
}
