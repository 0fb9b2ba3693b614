//! Decision Synthesizer agent: produces the final recommendation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use pipeline::{
    AgentError, AgentName, AgentOutput, Confidence, ConfidenceBreakdown, LanguageModel,
    PipelineState, SynthesisOutput,
};

use crate::agent::Agent;
use crate::json::{json_string, parse_agent_json};
use crate::validation::ValidationService;

const NAME: AgentName = AgentName::DecisionSynthesizer;

#[derive(Debug, Deserialize)]
struct BreakdownWire {
    input_completeness: f64,
    agent_agreement: f64,
    evidence_strength: f64,
    bias_impact: f64,
}

#[derive(Debug, Deserialize)]
struct SynthesisWire {
    winner: String,
    confidence: f64,
    confidence_breakdown: BreakdownWire,
    trade_offs: Vec<Value>,
    assumptions: Vec<String>,
    what_would_change_decision: Vec<String>,
}

/// The final pipeline step. Requires the Criteria Builder's and Option
/// Evaluator's outputs (bias findings are read when present); synthesizes
/// them into a verdict. `winner` must be literally one of the input options
/// and `confidence` plus all four breakdown factors must lie in `[0, 1]`;
/// violations are fatal.
pub struct DecisionSynthesizer {
    model: Arc<dyn LanguageModel>,
    validation: Arc<ValidationService>,
}

impl DecisionSynthesizer {
    /// Creates the agent with its model and validation collaborators.
    pub fn new(model: Arc<dyn LanguageModel>, validation: Arc<ValidationService>) -> Self {
        Self { model, validation }
    }
}

/// Bounds-checks one confidence factor, naming it on failure.
fn factor(name: &str, value: f64) -> Result<Confidence, AgentError> {
    Confidence::new(value).ok_or_else(|| AgentError::Validation {
        agent: NAME,
        message: format!("confidence breakdown factor {name} ({value}) must be between 0.0 and 1.0"),
    })
}

#[async_trait]
impl Agent for DecisionSynthesizer {
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
        let evaluation = state.evaluation().ok_or(AgentError::MissingDependency {
            agent: NAME,
            dependency: AgentName::OptionEvaluator,
        })?;
        let findings = state
            .biases()
            .map(|report| report.findings.clone())
            .unwrap_or_default();
        let input = state.input();

        let vars = json!({
            "decision_context": input.decision_context.as_str(),
            "options": json_string(NAME, &input.options)?,
            "criteria": json_string(NAME, criteria.as_slice())?,
            "scores": json_string(NAME, &evaluation.scores)?,
            "bias_findings": json_string(NAME, &findings)?,
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

        let wire: SynthesisWire =
            serde_json::from_value(value).map_err(|err| AgentError::Validation {
                agent: NAME,
                message: err.to_string(),
            })?;

        if !input.options.contains(&wire.winner) {
            return Err(AgentError::Validation {
                agent: NAME,
                message: format!(
                    "winner '{}' is not one of the options: {:?}",
                    wire.winner, input.options
                ),
            });
        }

        let confidence = Confidence::new(wire.confidence).ok_or_else(|| AgentError::Validation {
            agent: NAME,
            message: format!(
                "confidence score {} must be between 0.0 and 1.0",
                wire.confidence
            ),
        })?;

        let breakdown = ConfidenceBreakdown {
            input_completeness: factor("input_completeness", wire.confidence_breakdown.input_completeness)?,
            agent_agreement: factor("agent_agreement", wire.confidence_breakdown.agent_agreement)?,
            evidence_strength: factor("evidence_strength", wire.confidence_breakdown.evidence_strength)?,
            bias_impact: factor("bias_impact", wire.confidence_breakdown.bias_impact)?,
        };

        debug!(winner = %wire.winner, confidence = confidence.as_f64(), "decision synthesizer completed");
        Ok(AgentOutput::Synthesis(SynthesisOutput {
            winner: wire.winner,
            confidence,
            confidence_breakdown: breakdown,
            trade_offs: wire.trade_offs,
            assumptions: wire.assumptions,
            what_would_change_decision: wire.what_would_change_decision,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_state, ScriptedModel};
    use pipeline::{
        normalize_weights, BiasReport, CriteriaOutput, EvaluationReport, OptionScore,
        OptionScores, RawCriterion, Score,
    };
    use std::collections::BTreeMap;

    fn populated_state() -> PipelineState {
        let mut state = test_state();
        state
            .record(AgentOutput::Clarifier(Default::default()))
            .unwrap();
        let criteria = normalize_weights(vec![
            RawCriterion {
                name: "cost".to_string(),
                weight: 0.5,
                rationale: "Cost matters".to_string(),
            },
            RawCriterion {
                name: "time".to_string(),
                weight: 0.5,
                rationale: "Time matters".to_string(),
            },
        ])
        .unwrap();
        state
            .record(AgentOutput::Criteria(CriteriaOutput {
                criteria: criteria.clone(),
            }))
            .unwrap();
        state
            .record(AgentOutput::Biases(BiasReport::default()))
            .unwrap();

        let mut scores = BTreeMap::new();
        for (option, total) in [("Build now", 0.75), ("Postpone", 0.65)] {
            scores.insert(
                option.to_string(),
                OptionScores {
                    total_score: Score::clamped(total),
                    breakdown: vec![OptionScore {
                        criterion_name: "cost".to_string(),
                        score: Score::clamped(total),
                        justification: "j".to_string(),
                    }],
                },
            );
        }
        state
            .record(AgentOutput::Evaluation(EvaluationReport { scores }))
            .unwrap();
        state
    }

    fn agent(model: ScriptedModel) -> DecisionSynthesizer {
        let model: Arc<dyn LanguageModel> = Arc::new(model);
        let validation = Arc::new(ValidationService::without_repair(Arc::clone(&model)));
        DecisionSynthesizer::new(model, validation)
    }

    fn verdict(winner: &str, confidence: f64) -> String {
        format!(
            r#"{{
                "winner": "{winner}",
                "confidence": {confidence},
                "confidence_breakdown": {{
                    "input_completeness": 0.9,
                    "agent_agreement": 0.8,
                    "evidence_strength": 0.7,
                    "bias_impact": 0.95
                }},
                "trade_offs": [{{"higher_cost": "Build now costs more up front"}}],
                "assumptions": ["Team capacity is stable"],
                "what_would_change_decision": ["A budget cut"]
            }}"#
        )
    }

    #[tokio::test]
    async fn accepts_a_winner_from_the_options_list() {
        let model = ScriptedModel::returning(|_, _| Ok(verdict("Build now", 0.82)));
        let output = agent(model).execute(&populated_state()).await.unwrap();
        match output {
            AgentOutput::Synthesis(out) => {
                assert_eq!(out.winner, "Build now");
                assert!((out.confidence.as_f64() - 0.82).abs() < 1e-9);
            }
            other => panic!("wrong output kind: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_a_winner_outside_the_options_list() {
        let model = ScriptedModel::returning(|_, _| Ok(verdict("Do both", 0.9)));
        let err = agent(model).execute(&populated_state()).await.unwrap_err();
        match err {
            AgentError::Validation { message, .. } => {
                assert!(message.contains("Do both"));
                assert!(message.contains("Build now"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_out_of_range_confidence() {
        let model = ScriptedModel::returning(|_, _| Ok(verdict("Build now", 1.2)));
        let err = agent(model).execute(&populated_state()).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation { agent, .. } if agent == NAME));
    }

    #[tokio::test]
    async fn rejects_out_of_range_breakdown_factor() {
        let model = ScriptedModel::returning(|_, _| {
            Ok(r#"{
                "winner": "Build now",
                "confidence": 0.8,
                "confidence_breakdown": {
                    "input_completeness": 0.9,
                    "agent_agreement": 1.8,
                    "evidence_strength": 0.7,
                    "bias_impact": 0.95
                },
                "trade_offs": [],
                "assumptions": [],
                "what_would_change_decision": []
            }"#
            .to_string())
        });
        let err = agent(model).execute(&populated_state()).await.unwrap_err();
        match err {
            AgentError::Validation { message, .. } => {
                assert!(message.contains("agent_agreement"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_evaluation_slot_names_the_dependency() {
        let mut state = test_state();
        state
            .record(AgentOutput::Clarifier(Default::default()))
            .unwrap();
        let criteria = normalize_weights(vec![RawCriterion {
            name: "cost".to_string(),
            weight: 1.0,
            rationale: "r".to_string(),
        }])
        .unwrap();
        state
            .record(AgentOutput::Criteria(CriteriaOutput { criteria }))
            .unwrap();

        let model = ScriptedModel::failing("must not be called");
        let err = agent(model).execute(&state).await.unwrap_err();
        assert_eq!(
            err,
            AgentError::MissingDependency {
                agent: NAME,
                dependency: AgentName::OptionEvaluator,
            }
        );
    }
}
