//! The contract every agent implements: named steps, run individually or in order.
//!
//! Step bodies return `anyhow::Result`; the provided `run_step`/`run` convert
//! those into data (`StepResult`), so only a bad step name escapes as an error.

mod deps;
mod result;

pub use deps::AgentDeps;
pub use result::{RunResult, StepResult};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{agent} has no step '{step}'. Valid: [{}]", .valid.join(", "))]
    InvalidStep {
        agent: String,
        step: String,
        valid: Vec<String>,
    },
}

#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    /// Declared step order.
    fn steps(&self) -> &[&'static str];

    /// Body of one step. `step` is always one of [`Agent::steps`].
    async fn execute(&self, step: &str, deps: &AgentDeps, params: &Value) -> anyhow::Result<Value>;

    /// Runs one named step; failures inside the step come back as a failed `StepResult`.
    async fn run_step(
        &self,
        step: &str,
        deps: &AgentDeps,
        params: &Value,
    ) -> Result<StepResult, PipelineError> {
        ensure_step(self.name(), self.steps(), step)?;

        debug!(agent = self.name(), step, "running step");
        let result = StepResult::from_outcome(step, self.execute(step, deps, params).await);
        if let Some(error) = result.error() {
            warn!(agent = self.name(), step, "step failed: {}", error);
        }
        Ok(result)
    }

    /// Runs `steps` (default: all, in declared order), stopping at the first failure.
    ///
    /// Each successful step's output is visible to later steps under its step name,
    /// so a run can resume from a checkpoint by passing earlier outputs as params.
    async fn run(
        &self,
        deps: &AgentDeps,
        params: &Value,
        steps: Option<&[String]>,
    ) -> Result<RunResult, PipelineError> {
        let targets: Vec<String> = match steps {
            Some(requested) => requested.to_vec(),
            None => self.steps().iter().map(ToString::to_string).collect(),
        };
        for step in &targets {
            ensure_step(self.name(), self.steps(), step)?;
        }

        let started_at = Utc::now();
        let mut working = WorkingParams::new(params);
        let mut completed = Vec::with_capacity(targets.len());

        for step in &targets {
            let result = self.run_step(step, deps, working.value()).await?;
            let succeeded = result.success();
            if let Some(output) = result.output() {
                working.record(step, output.clone());
            }
            completed.push(result);
            if !succeeded {
                break;
            }
        }

        Ok(RunResult::from_steps(self.name(), completed, started_at))
    }
}

fn ensure_step(agent: &str, valid: &[&'static str], step: &str) -> Result<(), PipelineError> {
    if valid.iter().any(|s| *s == step) {
        return Ok(());
    }
    Err(PipelineError::InvalidStep {
        agent: agent.to_string(),
        step: step.to_string(),
        valid: valid.iter().map(ToString::to_string).collect(),
    })
}

/// Caller params plus the outputs of steps completed so far.
struct WorkingParams(Value);

impl WorkingParams {
    fn new(params: &Value) -> Self {
        match params {
            Value::Null => Self(Value::Object(Map::new())),
            other => Self(other.clone()),
        }
    }

    fn value(&self) -> &Value {
        &self.0
    }

    // Non-object params are passed through untouched.
    fn record(&mut self, step: &str, output: Value) {
        if let Value::Object(map) = &mut self.0 {
            map.insert(step.to_string(), output);
        }
    }
}
