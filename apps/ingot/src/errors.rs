use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::orchestrator::{AgentError, AgentFailure};
use crate::pipeline::PipelineError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, cause) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
            }
            AppError::Agent(e) => {
                let (status, code) = match &e.cause {
                    AgentFailure::NotFound(_) => (StatusCode::NOT_FOUND, "AGENT_NOT_FOUND"),
                    AgentFailure::Pipeline(PipelineError::InvalidStep { .. }) => {
                        (StatusCode::BAD_REQUEST, "INVALID_STEP")
                    }
                    AgentFailure::Aborted(_) => {
                        tracing::error!("Agent error: {e}");
                        (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR")
                    }
                };
                (status, code, e.message().to_string(), Some(e.cause.to_string()))
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
                "cause": cause
            }
        }));

        (status, body).into_response()
    }
}
