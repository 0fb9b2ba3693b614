//! The uniform agent contract.

use async_trait::async_trait;

use pipeline::{AgentError, AgentName, AgentOutput, PipelineState};

/// One deterministic step of the pipeline.
///
/// Every agent follows the same execution shape: extract its required inputs
/// from shared state (a missing upstream slot is a fatal
/// [`AgentError::MissingDependency`]), render its prompt template with
/// JSON-serialized input fields, call the language model, parse and validate
/// the completion, and return the typed output. Agents are stateless between
/// requests; the executor — not the agent — writes outputs into state.
#[async_trait]
pub trait Agent: Send + Sync {
    /// The agent's stable name, used for prompt lookup and error attribution.
    fn name(&self) -> AgentName;

    /// Executes the agent against the current pipeline state.
    async fn execute(&self, state: &PipelineState) -> Result<AgentOutput, AgentError>;
}
