//! API routes for the DecisionFlow service.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use agents::PipelineExecutor;
use llm::PromptLibrary;
use pipeline::{
    AgentName, DecisionRequest, DecisionResponse, RequestId, VersionMetadata, PIPELINE_ORDER,
};

use crate::errors::ApiError;
use crate::request_id::propagate_request_id;

/// Application state shared across handlers.
pub struct AppState {
    /// The wired five-agent executor.
    pub executor: PipelineExecutor,
    /// Prompt library, probed by the readiness check.
    pub prompts: Arc<PromptLibrary>,
    /// Versions echoed in responses and health output.
    pub versions: VersionMetadata,
}

/// Builds the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/decisions/analyze", post(analyze_decision))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .with_state(state)
        .layer(axum::middleware::from_fn(propagate_request_id))
        .layer(TraceLayer::new_for_http())
}

/// `POST /v1/decisions/analyze` — run the pipeline for one request.
async fn analyze_decision(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    request
        .validate()
        .map_err(|err| ApiError::invalid_request(request_id, &err))?;

    info!(request_id = %request_id, options = request.options.len(), "analyzing decision");
    let response = state
        .executor
        .run(request, request_id, state.versions.clone())
        .await
        .map_err(|err| ApiError::from_pipeline(&err))?;

    Ok(Json(response))
}

/// `GET /health` — liveness probe.
async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "versions": {
            "api_version": state.versions.api_version.as_str(),
            "logic_version": state.versions.logic_version.as_str(),
            "schema_version": state.versions.schema_version.as_str(),
        },
    }))
}

/// `GET /ready` — readiness probe: the configured prompt bundle must be
/// loadable (all five agent templates plus the repair template).
async fn ready(State(state): State<Arc<AppState>>) -> Response {
    let missing: Vec<&str> = PIPELINE_ORDER
        .iter()
        .copied()
        .chain(std::iter::once(AgentName::Repair))
        .filter(|agent| state.prompts.load(*agent).is_err())
        .map(AgentName::as_str)
        .collect();

    if missing.is_empty() {
        (StatusCode::OK, Json(json!({ "status": "ready" }))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready", "missing_templates": missing })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use llm::{ChatGateway, GatewayConfig, RetryConfig};
    use pipeline::{ApiVersion, LanguageModel, LogicVersion, SchemaVersion};
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tower::ServiceExt;

    fn gateway_config() -> GatewayConfig {
        GatewayConfig {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: "test-key".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            max_tokens: 2000,
            request_timeout: Duration::from_secs(30),
            max_concurrent_requests: 5,
            retry: RetryConfig::default(),
        }
    }

    fn app_with_prompts(root: &Path) -> Router {
        let versions = VersionMetadata {
            api_version: ApiVersion::new("v1").unwrap(),
            logic_version: LogicVersion::new("v1.0.0").unwrap(),
            schema_version: SchemaVersion::new("v1.0.0").unwrap(),
        };
        let prompts = Arc::new(PromptLibrary::new(
            root,
            versions.logic_version.clone(),
        ));
        let gateway = ChatGateway::new(gateway_config(), Arc::clone(&prompts)).unwrap();
        let model: Arc<dyn LanguageModel> = Arc::new(gateway);
        let state = Arc::new(AppState {
            executor: PipelineExecutor::new(model),
            prompts,
            versions,
        });
        router(state)
    }

    fn write_full_bundle(root: &Path) {
        let dir = root.join("v1.0.0");
        fs::create_dir_all(&dir).unwrap();
        for name in [
            "clarifier",
            "criteria_builder",
            "bias_checker",
            "option_evaluator",
            "decision_synthesizer",
            "repair",
        ] {
            fs::write(dir.join(format!("{name}.txt")), "{{ decision_context }}").unwrap();
        }
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with_prompts(dir.path());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn ready_fails_without_a_prompt_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with_prompts(dir.path());
        let response = app
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn ready_succeeds_with_a_complete_bundle() {
        let dir = tempfile::tempdir().unwrap();
        write_full_bundle(dir.path());
        let app = app_with_prompts(dir.path());
        let response = app
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn analyze_rejects_invalid_requests() {
        let dir = tempfile::tempdir().unwrap();
        write_full_bundle(dir.path());
        let app = app_with_prompts(dir.path());
        let body = serde_json::to_string(&serde_json::json!({
            "decision_context": "Should we build feature X?",
            "options": ["only one"],
        }))
        .unwrap();
        let response = app
            .oneshot(
                Request::post("/v1/decisions/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn caller_request_id_is_echoed() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with_prompts(dir.path());
        let id = "7f8a4b6e-1234-4c5d-9e8f-0a1b2c3d4e5f";
        let response = app
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", id)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], id);
    }
}
