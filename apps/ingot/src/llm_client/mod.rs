/// LLM client: the single point of entry for every completion call made by agent steps.
///
/// ARCHITECTURAL RULE: steps never talk to a provider directly. They build a
/// `CompletionRequest` and go through `LlmClient::complete`, which owns retries,
/// timeouts and the extraction cascade:
///
///   1. native tool-call arguments → JSON → schema
///   2. response text (inner fenced block if any) → JSON → schema
///   3. `<field>` tag fallback → schema
///
/// Only backend failures are retried. A reply that cannot be validated is
/// returned as `LlmError::Validation` straight away.
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

pub mod anthropic;
pub mod backend;
pub mod fallback;
pub mod openai;
pub mod prompts;
pub mod retry;
pub mod schema;

pub use backend::{
    Backend, BackendError, BackendResponse, CompletionRequest, Message, Role, ToolSpec, Usage,
};
pub use retry::RetryPolicy;
pub use schema::{FieldType, Schema, StructuredOutput};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("valid regex"));

/// A reply was obtained but no extraction path produced a valid record.
#[derive(Debug, Error)]
#[error("LLM response could not be validated as {schema}: {reason}")]
pub struct ValidationError {
    pub schema: String,
    pub reason: String,
    /// The unparsed response text, kept for diagnostics.
    pub raw_content: String,
}

impl ValidationError {
    pub fn new(
        schema: impl Into<String>,
        reason: impl Into<String>,
        raw_content: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            reason: reason.into(),
            raw_content: raw_content.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Outcome of one extraction path.
enum Extraction<T> {
    Parsed(T),
    ParseFailed(String),
}

/// The completion client handed to agent steps through `AgentDeps`.
/// Cheap to clone: the backend is shared behind an `Arc`.
#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn Backend>,
    model: String,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl LlmClient {
    pub fn new(backend: Arc<dyn Backend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            retry: RetryPolicy::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Same backend and policy, different model.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &'static str {
        self.backend.provider()
    }

    /// Calls the backend and returns a record validated against `request.schema()`.
    ///
    /// Retries backend failures with exponential backoff; a validation failure
    /// ends the call immediately.
    pub async fn complete<T: DeserializeOwned>(
        &self,
        request: &CompletionRequest,
    ) -> Result<T, LlmError> {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 1;

        loop {
            match self.call_backend(request).await {
                Ok(response) => {
                    if let Some(usage) = response.usage {
                        debug!(
                            "LLM call succeeded: model={}, input_tokens={}, output_tokens={}",
                            self.model, usage.input_tokens, usage.output_tokens
                        );
                    }
                    return extract_response(&response, request).map_err(LlmError::from);
                }
                Err(err) if attempt < max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "LLM call attempt {}/{} failed ({:#}), retrying after {}ms...",
                        attempt,
                        max_attempts,
                        anyhow::Error::from(err),
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(LlmError::Backend(BackendError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    }));
                }
            }
        }
    }

    async fn call_backend(
        &self,
        request: &CompletionRequest,
    ) -> Result<BackendResponse, BackendError> {
        match tokio::time::timeout(self.call_timeout, self.backend.submit(&self.model, request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.call_timeout)),
        }
    }
}

/// Runs the extraction cascade over one backend reply.
fn extract_response<T: DeserializeOwned>(
    response: &BackendResponse,
    request: &CompletionRequest,
) -> Result<T, ValidationError> {
    let schema = request.schema();
    let tool_args = response.tool_call_arguments.as_deref();

    if let Some(args) = tool_args {
        match parse_and_validate(args, schema) {
            Extraction::Parsed(value) => return Ok(value),
            Extraction::ParseFailed(reason) => {
                debug!("Tool call arguments rejected for {}, trying content: {reason}", schema.name());
            }
        }
    }

    let content = response.content.as_deref().unwrap_or_default();
    if !content.trim().is_empty() {
        match parse_and_validate(strip_json_fences(content), schema) {
            Extraction::Parsed(value) => return Ok(value),
            Extraction::ParseFailed(reason) => {
                debug!("Content is not valid JSON for {}: {reason}", schema.name());
            }
        }

        if request.use_fallback() {
            return fallback::extract_tagged(content, schema);
        }
    }

    let raw = if content.is_empty() {
        tool_args.unwrap_or_default()
    } else {
        content
    };
    Err(ValidationError::new(
        schema.name(),
        format!(
            "no extraction path succeeded (finish_reason={:?})",
            response.finish_reason
        ),
        raw,
    ))
}

fn parse_and_validate<T: DeserializeOwned>(raw: &str, schema: &Schema) -> Extraction<T> {
    let value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => return Extraction::ParseFailed(format!("invalid JSON: {e}")),
    };
    match schema.instantiate(value) {
        Ok(record) => Extraction::Parsed(record),
        Err(reason) => Extraction::ParseFailed(reason),
    }
}

/// Returns the body of the first ```json ... ``` or ``` ... ``` block, or the
/// trimmed text when there is none.
fn strip_json_fences(text: &str) -> &str {
    FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or_else(|| text.trim())
}
