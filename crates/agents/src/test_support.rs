//! Canned language models for agent tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use pipeline::{
    AgentName, ApiVersion, CompletionRequest, LanguageModel, LlmError, LogicVersion,
    NormalizedInput, PipelineState, RequestId, SchemaVersion, VersionMetadata,
};

/// A two-option pipeline state, freshly created with no slots populated.
pub(crate) fn test_state() -> PipelineState {
    let versions = VersionMetadata {
        api_version: ApiVersion::new("v1").unwrap(),
        logic_version: LogicVersion::new("v1.0.0").unwrap(),
        schema_version: SchemaVersion::new("v1.0.0").unwrap(),
    };
    let input = NormalizedInput {
        decision_context: "Should we build feature X?".to_string(),
        options: vec!["Build now".to_string(), "Postpone".to_string()],
        constraints: None,
        criteria_preferences: None,
        context_metadata: None,
    };
    PipelineState::new(RequestId::new_random(), versions, input)
}

type Handler = Box<dyn Fn(AgentName, &Value) -> Result<String, LlmError> + Send + Sync>;

/// A [`LanguageModel`] whose completions come from a test-supplied handler.
///
/// Records which agents called it and tracks the maximum number of
/// simultaneously in-flight calls, so tests can assert both attribution and
/// concurrency.
pub(crate) struct ScriptedModel {
    handler: Handler,
    delay: Option<Duration>,
    calls: Mutex<Vec<AgentName>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedModel {
    /// Completions produced by `handler`, keyed on (agent, template vars).
    pub fn returning<F>(handler: F) -> Self
    where
        F: Fn(AgentName, &Value) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: None,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every completion fails with a configuration error carrying `detail`.
    pub fn failing(detail: &'static str) -> Self {
        Self::returning(move |_, _| {
            Err(LlmError::Configuration {
                detail: detail.to_string(),
            })
        })
    }

    /// Adds a simulated latency to every completion.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Agents that called the model, in call order.
    pub fn calls(&self) -> Vec<AgentName> {
        self.calls.lock().unwrap().clone()
    }

    /// Maximum number of completions that were in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
        Err(LlmError::Configuration {
            detail: "ScriptedModel only serves template completions".to_string(),
        })
    }

    async fn complete_with_template(
        &self,
        agent: AgentName,
        vars: &Value,
    ) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(agent);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = (self.handler)(agent, vars);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
