//! DecisionFlow HTTP entry point.
//!
//! This binary is the composition root for the entire system:
//!
//! 1. **Parse configuration** — flags and environment variables.
//! 2. **Wire observability** — `tracing-subscriber` with an env filter and
//!    JSON or text formatting; every crate in the workspace logs through it.
//! 3. **Construct infrastructure** — the prompt library and chat gateway,
//!    injected into the [`agents::PipelineExecutor`].
//! 4. **Serve** — bind the listener and run the axum router.

mod errors;
mod observability;
mod request_id;
mod routes;
mod settings;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use agents::PipelineExecutor;
use llm::{ChatGateway, PromptLibrary};
use pipeline::LanguageModel;

use crate::routes::AppState;
use crate::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();
    observability::init(&settings)?;

    let versions = settings.version_metadata()?;
    let prompts = Arc::new(PromptLibrary::new(
        settings.prompts_dir.clone(),
        versions.logic_version.clone(),
    ));
    let gateway = ChatGateway::new(settings.gateway_config(), Arc::clone(&prompts))
        .context("failed to construct the LLM gateway")?;
    let model: Arc<dyn LanguageModel> = Arc::new(gateway);
    let executor = PipelineExecutor::new(model);

    let state = Arc::new(AppState {
        executor,
        prompts,
        versions,
    });
    let app = routes::router(state);

    let addr = settings.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, model = %settings.openai_model, "decisionflow listening");

    axum::serve(listener, app).await.context("server terminated")
}
