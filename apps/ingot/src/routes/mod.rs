pub mod agents;
pub mod health;

use axum::{
    http::Uri,
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::state::AppState;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {uri}"))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/agents", get(agents::handle_list_agents))
        .route("/api/v1/agents/:name/steps", get(agents::handle_list_steps))
        .route("/api/v1/agents/:name/run", post(agents::handle_run_agent))
        .route(
            "/api/v1/agents/:name/steps/:step",
            post(agents::handle_run_step),
        )
        .route("/api/v1/runs/batch", post(agents::handle_run_batch))
        .fallback(not_found)
        .with_state(state)
}
