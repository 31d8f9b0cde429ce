use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::dispatcher::{TaskDispatcher, TaskResult};
use crate::errors::AppError;
use crate::pipeline::{RunResult, StepResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct AgentListResponse {
    pub agents: Vec<String>,
}

#[derive(Serialize)]
pub struct StepListResponse {
    pub agent: String,
    pub steps: Vec<String>,
}

#[derive(Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub params: Value,
    /// Subset of steps to run, in the given order. All steps when absent.
    pub steps: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct StepRequest {
    #[serde(default)]
    pub params: Value,
}

#[derive(Deserialize)]
pub struct BatchRun {
    pub agent: String,
    #[serde(default)]
    pub params: Value,
    pub steps: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct BatchRequest {
    pub runs: Vec<BatchRun>,
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub results: Vec<TaskResult<RunResult>>,
}

/// GET /api/v1/agents
pub async fn handle_list_agents(State(state): State<AppState>) -> Json<AgentListResponse> {
    Json(AgentListResponse {
        agents: state.orchestrator.list_available_agents(),
    })
}

/// GET /api/v1/agents/:name/steps
pub async fn handle_list_steps(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StepListResponse>, AppError> {
    let steps = state.orchestrator.list_steps(&name)?;
    Ok(Json(StepListResponse { agent: name, steps }))
}

/// POST /api/v1/agents/:name/run
pub async fn handle_run_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<RunRequest>,
) -> Result<Json<RunResult>, AppError> {
    let result = state
        .orchestrator
        .run(&name, &req.params, req.steps.as_deref())
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/agents/:name/steps/:step
pub async fn handle_run_step(
    State(state): State<AppState>,
    Path((name, step)): Path<(String, String)>,
    Json(req): Json<StepRequest>,
) -> Result<Json<StepResult>, AppError> {
    let result = state.orchestrator.run_step(&name, &step, &req.params).await?;
    Ok(Json(result))
}

/// POST /api/v1/runs/batch
/// Independent runs (typically one per lead), at most `DISPATCH_MAX_WORKERS` at a time.
/// Results are in completion order; task names are `<agent>#<index in request>`.
pub async fn handle_run_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, AppError> {
    if req.runs.is_empty() {
        return Err(AppError::Validation("runs must not be empty".to_string()));
    }

    let mut dispatcher = TaskDispatcher::new(state.config.dispatch_max_workers);
    for (index, run) in req.runs.into_iter().enumerate() {
        let orchestrator = state.orchestrator.clone();
        dispatcher.enqueue(format!("{}#{index}", run.agent), async move {
            orchestrator
                .run(&run.agent, &run.params, run.steps.as_deref())
                .await
                .map_err(anyhow::Error::from)
        });
    }

    info!("Dispatching batch of {} runs", dispatcher.len());
    let results = dispatcher.run_all().await;
    Ok(Json(BatchResponse { results }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::json;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::orchestrator::Orchestrator;
    use crate::pipeline::{Agent, AgentDeps};
    use crate::registry::AgentRegistry;
    use crate::routes::build_router;
    use crate::state::AppState;
    use crate::test_support::offline_deps;

    use super::*;

    /// `greet` echoes `params.name`; `fail` always fails.
    struct Greeter;

    #[async_trait]
    impl Agent for Greeter {
        fn name(&self) -> &str {
            "greeter"
        }

        fn steps(&self) -> &[&'static str] {
            &["greet", "fail"]
        }

        async fn execute(&self, step: &str, _deps: &AgentDeps, params: &Value) -> anyhow::Result<Value> {
            match step {
                "greet" => {
                    let name = params["name"].as_str().unwrap_or("stranger");
                    Ok(json!({ "greeting": format!("hello {name}") }))
                }
                _ => anyhow::bail!("no thanks"),
            }
        }
    }

    struct Panicky;

    #[async_trait]
    impl Agent for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }

        fn steps(&self) -> &[&'static str] {
            &["boom"]
        }

        async fn execute(&self, _step: &str, _deps: &AgentDeps, _params: &Value) -> anyhow::Result<Value> {
            panic!("step blew up");
        }
    }

    fn app_with(registry: AgentRegistry) -> Router {
        let config = Config::from_lookup(|_| None).unwrap();
        build_router(AppState {
            orchestrator: Arc::new(Orchestrator::new(Arc::new(registry), offline_deps())),
            config,
        })
    }

    fn app() -> Router {
        let mut registry = AgentRegistry::new();
        registry.register("greeter", Arc::new(Greeter));
        app_with(registry)
    }

    async fn call(method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send(app(), method, uri, body).await
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call("GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "ingot");
    }

    #[tokio::test]
    async fn test_list_agents_and_steps() {
        let (status, body) = call("GET", "/api/v1/agents", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"agents": ["greeter"]}));

        let (status, body) = call("GET", "/api/v1/agents/greeter/steps", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["steps"], json!(["greet", "fail"]));
    }

    #[tokio::test]
    async fn test_unknown_agent_is_404() {
        let (status, body) = call("GET", "/api/v1/agents/scout/steps", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "AGENT_NOT_FOUND");
        assert_eq!(
            body["error"]["cause"],
            "Agent 'scout' not in registry. Registered: [greeter]"
        );
    }

    #[tokio::test]
    async fn test_run_subset() {
        let (status, body) = call(
            "POST",
            "/api/v1/agents/greeter/run",
            Some(json!({"params": {"name": "Ada"}, "steps": ["greet"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["final_output"]["greeting"], "hello Ada");
        assert!(body["run_id"].is_string());
    }

    #[tokio::test]
    async fn test_failed_step_is_200_with_failure_recorded() {
        let (status, body) = call("POST", "/api/v1/agents/greeter/run", Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["steps"][1]["step"], "fail");
        assert_eq!(body["steps"][1]["error"], "no thanks");
    }

    #[tokio::test]
    async fn test_unknown_step_is_400() {
        let (status, body) = call(
            "POST",
            "/api/v1/agents/greeter/steps/wave",
            Some(json!({"params": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_STEP");
        assert_eq!(
            body["error"]["message"],
            "Agent 'greeter' step 'wave' failed: greeter has no step 'wave'. Valid: [greet, fail]"
        );
    }

    #[tokio::test]
    async fn test_run_single_step() {
        let (status, body) = call(
            "POST",
            "/api/v1/agents/greeter/steps/greet",
            Some(json!({"params": {"name": "Grace"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["output"]["greeting"], "hello Grace");
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let (status, body) = call(
            "POST",
            "/api/v1/runs/batch",
            Some(json!({"runs": [
                {"agent": "greeter", "params": {"name": "Ada"}, "steps": ["greet"]},
                {"agent": "scout"},
                {"agent": "greeter", "params": {"name": "Grace"}, "steps": ["greet"]}
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        let scout = results.iter().find(|r| r["task_name"] == "scout#1").unwrap();
        assert_eq!(scout["success"], false);
        assert!(scout["error"].as_str().unwrap().contains("not in registry"));
        assert_eq!(results.iter().filter(|r| r["success"] == true).count(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let (status, body) = call("POST", "/api/v1/runs/batch", Some(json!({"runs": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_panicking_agent_is_500() {
        let mut registry = AgentRegistry::new();
        registry.register("panicky", Arc::new(Panicky));

        let (status, body) = send(
            app_with(registry),
            "POST",
            "/api/v1/agents/panicky/run",
            Some(json!({"params": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "AGENT_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Agent 'panicky' failed: agent task aborted:"));
        assert!(body["error"]["cause"]
            .as_str()
            .unwrap()
            .starts_with("agent task aborted:"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (status, body) = call("GET", "/api/v2/anything", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
