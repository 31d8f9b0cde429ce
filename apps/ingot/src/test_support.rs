//! Shared doubles for unit tests: a scripted backend and ready-made `AgentDeps`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::llm_client::{
    Backend, BackendError, BackendResponse, CompletionRequest, LlmClient, RetryPolicy,
};
use crate::pipeline::AgentDeps;

/// Replays a fixed script of replies, recording each request and when it arrived.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<BackendResponse, BackendError>>>,
    calls: Mutex<Vec<Instant>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<BackendResponse, BackendError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        })
    }

    /// Backend answering each call with the next text reply.
    pub fn replies(texts: &[&str]) -> Arc<Self> {
        Self::new(
            texts
                .iter()
                .map(|t| Ok(BackendResponse::text(*t)))
                .collect(),
        )
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn provider(&self) -> &'static str {
        "scripted"
    }

    async fn submit(
        &self,
        _model: &str,
        request: &CompletionRequest,
    ) -> Result<BackendResponse, BackendError> {
        self.calls.lock().unwrap().push(Instant::now());
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::MalformedResponse("script exhausted".into())))
    }
}

/// Client with a single attempt, so scripted failures surface immediately.
pub fn llm(backend: Arc<ScriptedBackend>) -> LlmClient {
    LlmClient::new(backend, "test-model").with_retry_policy(RetryPolicy::new(
        1,
        Duration::from_millis(1),
        Duration::from_millis(1),
    ))
}

pub fn deps(backend: Arc<ScriptedBackend>) -> AgentDeps {
    AgentDeps::new(llm(backend), reqwest::Client::new())
}

/// Deps whose backend fails every call; for agents that never reach the LLM.
pub fn offline_deps() -> AgentDeps {
    deps(ScriptedBackend::new(Vec::new()))
}
