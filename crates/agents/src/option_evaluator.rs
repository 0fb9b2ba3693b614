//! Option Evaluator agent: scores every option against every criterion.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use pipeline::{
    weighted_total, AgentError, AgentName, AgentOutput, CriteriaSet, EvaluationReport,
    LanguageModel, NormalizedInput, OptionScore, OptionScores, PipelineState, Score,
};

use crate::agent::Agent;
use crate::json::{json_string, parse_agent_json};
use crate::validation::ValidationService;

const NAME: AgentName = AgentName::OptionEvaluator;

#[derive(Debug, Deserialize)]
struct ScoreWire {
    criterion_name: String,
    score: f64,
    justification: String,
}

#[derive(Debug, Deserialize)]
struct ScoresWire {
    scores: Vec<ScoreWire>,
}

/// The fourth pipeline step. Requires the Criteria Builder's output; issues
/// one completion per option, all dispatched concurrently (the calls are
/// mutually independent, bounded only by the gateway's admission ceiling).
/// Per-criterion scores are silently clamped into `[0, 1]`; each option's
/// `total_score` is the weighted sum over matching criteria. Every sub-call
/// must succeed or the whole step fails.
pub struct OptionEvaluator {
    model: Arc<dyn LanguageModel>,
    validation: Arc<ValidationService>,
}

impl OptionEvaluator {
    /// Creates the agent with its model and validation collaborators.
    pub fn new(model: Arc<dyn LanguageModel>, validation: Arc<ValidationService>) -> Self {
        Self { model, validation }
    }

    /// Scores a single option against the criteria set.
    async fn score_option(
        &self,
        input: &NormalizedInput,
        criteria: &CriteriaSet,
        option: &str,
    ) -> Result<(String, OptionScores), AgentError> {
        let vars = json!({
            "decision_context": input.decision_context.as_str(),
            "option": option,
            "options": json_string(NAME, &input.options)?,
            "criteria": json_string(NAME, criteria.as_slice())?,
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

        let wire: ScoresWire =
            serde_json::from_value(value).map_err(|err| AgentError::Validation {
                agent: NAME,
                message: err.to_string(),
            })?;

        let breakdown: Vec<OptionScore> = wire
            .scores
            .into_iter()
            .map(|entry| OptionScore {
                criterion_name: entry.criterion_name,
                score: Score::clamped(entry.score),
                justification: entry.justification,
            })
            .collect();
        let total_score = weighted_total(&breakdown, criteria);

        Ok((
            option.to_string(),
            OptionScores {
                total_score,
                breakdown,
            },
        ))
    }
}

#[async_trait]
impl Agent for OptionEvaluator {
    fn name(&self) -> AgentName {
        NAME
    }

    async fn execute(&self, state: &PipelineState) -> Result<AgentOutput, AgentError> {
        let criteria = &state
            .criteria()
            .ok_or(AgentError::MissingDependency {
                agent: NAME,
                dependency: AgentName::CriteriaBuilder,
            })?
            .criteria;
        let input = state.input();

        // One completion per option, overlapped so wall-clock cost
        // approaches max(latency) rather than sum(latency).
        let evaluations = try_join_all(
            input
                .options
                .iter()
                .map(|option| self.score_option(input, criteria, option)),
        )
        .await?;

        let scores: BTreeMap<String, OptionScores> = evaluations.into_iter().collect();
        debug!(options = scores.len(), "option evaluator completed");
        Ok(AgentOutput::Evaluation(EvaluationReport { scores }))
    }
}
