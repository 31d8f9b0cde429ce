//! Single entry point for running agents. Every failure that escapes an agent
//! (unknown name, unknown step, a panic inside a step) is turned into one
//! `AgentError` here and nowhere else.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::pipeline::{AgentDeps, PipelineError, RunResult, StepResult};
use crate::registry::{AgentRegistry, RegistryError};

/// What went wrong underneath an `AgentError`.
#[derive(Debug, Error)]
pub enum AgentFailure {
    #[error(transparent)]
    NotFound(#[from] RegistryError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("agent task aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct AgentError {
    pub agent_name: String,
    pub step: Option<String>,
    message: String,
    /// Already rendered into the message, so not exposed as `source()`.
    pub cause: AgentFailure,
}

impl AgentError {
    fn new(agent_name: &str, step: Option<&str>, cause: AgentFailure) -> Self {
        let message = match step {
            Some(step) => format!("Agent '{agent_name}' step '{step}' failed: {cause}"),
            None => format!("Agent '{agent_name}' failed: {cause}"),
        };
        Self {
            agent_name: agent_name.to_string(),
            step: step.map(ToString::to_string),
            message,
            cause,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    deps: AgentDeps,
}

impl Orchestrator {
    pub fn new(registry: Arc<AgentRegistry>, deps: AgentDeps) -> Self {
        Self { registry, deps }
    }

    /// Runs `steps` of `agent_name` (default: all). A failed step is reported
    /// inside the returned `RunResult`, not as an error.
    pub async fn run(
        &self,
        agent_name: &str,
        params: &Value,
        steps: Option<&[String]>,
    ) -> Result<RunResult, AgentError> {
        let fail = |cause: AgentFailure| AgentError::new(agent_name, None, cause);

        let agent = self.registry.get(agent_name).map_err(|e| fail(e.into()))?;
        let deps = self.deps.for_agent(agent_name);
        let params = params.clone();
        let steps = steps.map(<[String]>::to_vec);

        let span = info_span!("agent_run", agent = agent_name, invocation = %Uuid::new_v4());
        info!(parent: &span, "Dispatching agent '{}'", agent_name);

        let task = async move { agent.run(&deps, &params, steps.as_deref()).await };
        let result = tokio::spawn(task.instrument(span.clone()))
            .await
            .map_err(|e| fail(AgentFailure::Aborted(e.to_string())))?
            .map_err(|e| fail(e.into()))?;

        if result.success {
            info!(
                parent: &span,
                "Agent '{}' finished (run {}, {} steps)",
                agent_name,
                result.run_id,
                result.steps.len()
            );
        } else {
            error!(
                parent: &span,
                "Agent '{}' stopped at step '{}' (run {})",
                agent_name,
                result.failed_step().map(StepResult::step).unwrap_or_default(),
                result.run_id
            );
        }
        Ok(result)
    }

    /// Runs a single step of `agent_name`.
    pub async fn run_step(
        &self,
        agent_name: &str,
        step: &str,
        params: &Value,
    ) -> Result<StepResult, AgentError> {
        let fail = |cause: AgentFailure| AgentError::new(agent_name, Some(step), cause);

        let agent = self.registry.get(agent_name).map_err(|e| fail(e.into()))?;
        let deps = self.deps.for_agent(agent_name);
        let params = params.clone();
        let step_name = step.to_string();

        let span = info_span!("agent_step", agent = agent_name, step, invocation = %Uuid::new_v4());
        info!(parent: &span, "Running step '{}' of agent '{}'", step, agent_name);

        let task = async move { agent.run_step(&step_name, &deps, &params).await };
        tokio::spawn(task.instrument(span))
            .await
            .map_err(|e| fail(AgentFailure::Aborted(e.to_string())))?
            .map_err(|e| fail(e.into()))
    }

    pub fn list_available_agents(&self) -> Vec<String> {
        self.registry.list()
    }

    pub fn list_steps(&self, agent_name: &str) -> Result<Vec<String>, AgentError> {
        let agent = self
            .registry
            .get(agent_name)
            .map_err(|e| AgentError::new(agent_name, None, e.into()))?;
        Ok(agent.steps().iter().map(ToString::to_string).collect())
    }
}
