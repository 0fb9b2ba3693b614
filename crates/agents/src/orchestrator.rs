//! Deterministic pipeline execution.
//!
//! The agent sequence is data: [`PipelineExecutor`] holds the five agents in
//! [`pipeline::PIPELINE_ORDER`] and drives them through a single loop with
//! early exit on failure. On success the response is assembled as a pure
//! projection of the final state — never independently computed.

use std::sync::Arc;

use tracing::{debug, warn};

use pipeline::{
    AgentName, AgentOutput, DecisionRequest, DecisionResponse, LanguageModel, NormalizedInput,
    PipelineError, PipelineState, RequestId, StateError, VersionMetadata, PIPELINE_ORDER,
};

use crate::agent::Agent;
use crate::bias_checker::BiasChecker;
use crate::clarifier::Clarifier;
use crate::criteria_builder::CriteriaBuilder;
use crate::decision_synthesizer::DecisionSynthesizer;
use crate::option_evaluator::OptionEvaluator;
use crate::validation::ValidationService;

/// Executes the five-step pipeline over one shared state object.
///
/// There are no pipeline-level retries (retries live inside the gateway) and
/// no partial responses: the first failing step aborts the remainder and
/// surfaces a [`PipelineError`] naming the agent and request.
pub struct PipelineExecutor {
    agents: Vec<Box<dyn Agent>>,
}

impl PipelineExecutor {
    /// Wires the five agents against a language model, sharing one
    /// validation service (with repair enabled) across them.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        let validation = Arc::new(ValidationService::new(Arc::clone(&model)));
        let agents: Vec<Box<dyn Agent>> = vec![
            Box::new(Clarifier::new(Arc::clone(&model), Arc::clone(&validation))),
            Box::new(CriteriaBuilder::new(Arc::clone(&model), Arc::clone(&validation))),
            Box::new(BiasChecker::new(Arc::clone(&model), Arc::clone(&validation))),
            Box::new(OptionEvaluator::new(Arc::clone(&model), Arc::clone(&validation))),
            Box::new(DecisionSynthesizer::new(model, validation)),
        ];
        debug_assert!(agents.iter().map(|agent| agent.name()).eq(PIPELINE_ORDER));
        Self { agents }
    }

    /// Builds an executor over an explicit agent sequence (test seam).
    pub fn from_agents(agents: Vec<Box<dyn Agent>>) -> Self {
        Self { agents }
    }

    /// Entry point for one request: normalize input, build state, execute.
    pub async fn run(
        &self,
        request: DecisionRequest,
        request_id: RequestId,
        versions: VersionMetadata,
    ) -> Result<DecisionResponse, PipelineError> {
        let input = NormalizedInput::from_request(request);
        let mut state = PipelineState::new(request_id, versions, input);
        self.execute(&mut state).await
    }

    /// Runs every agent in order against `state`, recording each output
    /// into its slot, then assembles the response from the populated slots.
    pub async fn execute(
        &self,
        state: &mut PipelineState,
    ) -> Result<DecisionResponse, PipelineError> {
        let request_id = state.request_id();
        for agent in &self.agents {
            let name = agent.name();
            debug!(request_id = %request_id, agent = %name, "executing pipeline step");

            let output = agent
                .execute(state)
                .await
                .map_err(|source| PipelineError::Agent {
                    request_id,
                    agent: name,
                    source,
                })?;

            if let AgentOutput::Clarifier(clarifier) = &output {
                if clarifier.needs_more_information() {
                    // Advisory only: the pipeline continues and the caller
                    // receives the questions through the response state.
                    warn!(
                        request_id = %request_id,
                        missing_fields = clarifier.missing_fields.len(),
                        questions = clarifier.questions.len(),
                        "clarifier flagged missing information"
                    );
                }
            }

            state
                .record(output)
                .map_err(|source| PipelineError::State { request_id, source })?;
        }

        debug!(
            request_id = %request_id,
            elapsed_ms = state.started_at().elapsed_ms(),
            "pipeline complete"
        );
        assemble_response(state).map_err(|source| PipelineError::State { request_id, source })
    }
}

/// Projects the final response from a fully populated state.
///
/// Reads every slot back out of state — criteria, scores, bias findings,
/// verdict — plus the normalized input; nothing is recomputed.
pub fn assemble_response(state: &PipelineState) -> Result<DecisionResponse, StateError> {
    let criteria = state.criteria().ok_or(StateError::SlotMissing {
        agent: AgentName::CriteriaBuilder,
    })?;
    let biases = state.biases().ok_or(StateError::SlotMissing {
        agent: AgentName::BiasChecker,
    })?;
    let evaluation = state.evaluation().ok_or(StateError::SlotMissing {
        agent: AgentName::OptionEvaluator,
    })?;
    let synthesis = state.synthesis().ok_or(StateError::SlotMissing {
        agent: AgentName::DecisionSynthesizer,
    })?;
    let input = state.input();

    Ok(DecisionResponse {
        decision: input.decision_context.clone(),
        options: input.options.clone(),
        criteria: criteria.criteria.clone(),
        scores: evaluation.scores.clone(),
        winner: synthesis.winner.clone(),
        confidence: synthesis.confidence,
        confidence_breakdown: synthesis.confidence_breakdown,
        biases_detected: biases.findings.clone(),
        trade_offs: synthesis.trade_offs.clone(),
        assumptions: synthesis.assumptions.clone(),
        risks: Vec::new(),
        what_would_change_decision: synthesis.what_would_change_decision.clone(),
        meta: state.versions().clone(),
        request_id: state.request_id(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_state, ScriptedModel};
    use async_trait::async_trait;
    use pipeline::{
        normalize_weights, AgentError, BiasReport, ClarifierOutput, Confidence,
        ConfidenceBreakdown, CriteriaOutput, EvaluationReport, OptionScore, OptionScores,
        RawCriterion, Score, SynthesisOutput,
    };
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    fn criteria_output() -> CriteriaOutput {
        CriteriaOutput {
            criteria: normalize_weights(vec![
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
            .unwrap(),
        }
    }

    fn evaluation_output() -> EvaluationReport {
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
        EvaluationReport { scores }
    }

    fn synthesis_output() -> SynthesisOutput {
        SynthesisOutput {
            winner: "Build now".to_string(),
            confidence: Confidence::new(0.82).unwrap(),
            confidence_breakdown: ConfidenceBreakdown {
                input_completeness: Confidence::new(0.9).unwrap(),
                agent_agreement: Confidence::new(0.8).unwrap(),
                evidence_strength: Confidence::new(0.7).unwrap(),
                bias_impact: Confidence::new(0.95).unwrap(),
            },
            trade_offs: Vec::new(),
            assumptions: vec!["Team capacity is stable".to_string()],
            what_would_change_decision: vec!["A budget cut".to_string()],
        }
    }

    fn canned_output(name: AgentName) -> AgentOutput {
        match name {
            AgentName::Clarifier => AgentOutput::Clarifier(ClarifierOutput::default()),
            AgentName::CriteriaBuilder => AgentOutput::Criteria(criteria_output()),
            AgentName::BiasChecker => AgentOutput::Biases(BiasReport::default()),
            AgentName::OptionEvaluator => AgentOutput::Evaluation(evaluation_output()),
            AgentName::DecisionSynthesizer => AgentOutput::Synthesis(synthesis_output()),
            AgentName::Repair => unreachable!("repair is not a pipeline step"),
        }
    }

    /// Records its execution into a shared log; optionally fails.
    struct CannedAgent {
        name: AgentName,
        fails: bool,
        log: Arc<Mutex<Vec<AgentName>>>,
        executed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Agent for CannedAgent {
        fn name(&self) -> AgentName {
            self.name
        }

        async fn execute(&self, _state: &PipelineState) -> Result<AgentOutput, AgentError> {
            self.executed.store(true, Ordering::SeqCst);
            self.log.lock().unwrap().push(self.name);
            if self.fails {
                return Err(AgentError::Validation {
                    agent: self.name,
                    message: "canned failure".to_string(),
                });
            }
            Ok(canned_output(self.name))
        }
    }

    fn canned_pipeline(
        failing: Option<AgentName>,
    ) -> (PipelineExecutor, Arc<Mutex<Vec<AgentName>>>, Vec<Arc<AtomicBool>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut flags = Vec::new();
        let agents: Vec<Box<dyn Agent>> = PIPELINE_ORDER
            .iter()
            .map(|name| {
                let executed = Arc::new(AtomicBool::new(false));
                flags.push(Arc::clone(&executed));
                Box::new(CannedAgent {
                    name: *name,
                    fails: failing == Some(*name),
                    log: Arc::clone(&log),
                    executed,
                }) as Box<dyn Agent>
            })
            .collect();
        (PipelineExecutor::from_agents(agents), log, flags)
    }

    #[tokio::test]
    async fn executes_all_five_agents_in_fixed_order() {
        let (executor, log, _) = canned_pipeline(None);
        let mut state = test_state();
        let response = executor.execute(&mut state).await.unwrap();

        assert_eq!(*log.lock().unwrap(), PIPELINE_ORDER.to_vec());
        for agent in PIPELINE_ORDER {
            assert!(state.has_output(agent), "{agent} slot must be populated");
        }
        // Response is a projection of the synthesizer and criteria outputs.
        assert_eq!(response.winner, "Build now");
        assert!((response.confidence.as_f64() - 0.82).abs() < 1e-9);
        assert_eq!(response.criteria, criteria_output().criteria);
        assert_eq!(response.scores["Postpone"].total_score.as_f64(), 0.65);
        assert_eq!(response.request_id, state.request_id());
        assert!(response.risks.is_empty());
    }

    #[tokio::test]
    async fn failure_aborts_before_later_agents_execute() {
        let (executor, log, flags) = canned_pipeline(Some(AgentName::BiasChecker));
        let mut state = test_state();
        let err = executor.execute(&mut state).await.unwrap_err();

        assert_eq!(err.agent(), Some(AgentName::BiasChecker));
        assert_eq!(err.request_id(), state.request_id());
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                AgentName::Clarifier,
                AgentName::CriteriaBuilder,
                AgentName::BiasChecker
            ]
        );
        // Option Evaluator and Decision Synthesizer never ran.
        assert!(!flags[3].load(Ordering::SeqCst));
        assert!(!flags[4].load(Ordering::SeqCst));
        assert!(!state.has_output(AgentName::BiasChecker));
    }

    #[tokio::test]
    async fn first_agent_failure_leaves_no_slots_populated() {
        let (executor, _, flags) = canned_pipeline(Some(AgentName::Clarifier));
        let mut state = test_state();
        let err = executor.execute(&mut state).await.unwrap_err();

        assert_eq!(err.agent(), Some(AgentName::Clarifier));
        for agent in PIPELINE_ORDER {
            assert!(!state.has_output(agent));
        }
        assert!(!flags[1].load(Ordering::SeqCst));
    }

    /// Full pipeline over real agents driven by a scripted model.
    #[tokio::test]
    async fn end_to_end_with_scripted_completions() {
        let model = Arc::new(ScriptedModel::returning(|agent, vars| {
            let text = match agent {
                AgentName::Clarifier => r#"{"missing_fields": [], "questions": []}"#.to_string(),
                AgentName::CriteriaBuilder => r#"{
                    "criteria": [
                        {"name": "cost", "weight": 0.5, "rationale": "Cost matters"},
                        {"name": "time", "weight": 0.5, "rationale": "Time matters"}
                    ]
                }"#
                .to_string(),
                AgentName::BiasChecker => r#"{
                    "bias_findings": [
                        {"bias_type": "OPTIMISM", "description": "d", "evidence": "e"}
                    ]
                }"#
                .to_string(),
                AgentName::OptionEvaluator => {
                    let score = if vars["option"] == "Build now" { 0.75 } else { 0.65 };
                    format!(
                        r#"{{
                            "scores": [
                                {{"criterion_name": "cost", "score": {score}, "justification": "j"}},
                                {{"criterion_name": "time", "score": {score}, "justification": "j"}}
                            ]
                        }}"#
                    )
                }
                AgentName::DecisionSynthesizer => r#"{
                    "winner": "Build now",
                    "confidence": 0.8,
                    "confidence_breakdown": {
                        "input_completeness": 0.9,
                        "agent_agreement": 0.8,
                        "evidence_strength": 0.7,
                        "bias_impact": 0.95
                    },
                    "trade_offs": [],
                    "assumptions": [],
                    "what_would_change_decision": []
                }"#
                .to_string(),
                AgentName::Repair => panic!("no repair expected"),
            };
            Ok(text)
        }));

        let shared: Arc<dyn LanguageModel> = model.clone();
        let executor = PipelineExecutor::new(shared);
        let mut state = test_state();
        let response = executor.execute(&mut state).await.unwrap();

        assert_eq!(response.winner, "Build now");
        assert_eq!(response.biases_detected[0].bias_type.as_str(), "optimism");
        assert!((response.scores["Build now"].total_score.as_f64() - 0.75).abs() < 1e-3);
        // One call per agent plus one per option for the evaluator.
        assert_eq!(model.calls().len(), 6);
    }
}
