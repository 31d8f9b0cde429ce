use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Outcome of one step. `error` is set exactly when `success` is false.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    step: String,
    success: bool,
    output: Option<Value>,
    error: Option<String>,
}

impl StepResult {
    pub fn succeeded(step: impl Into<String>, output: Value) -> Self {
        Self {
            step: step.into(),
            success: true,
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(step: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Captures a step body's outcome; the error keeps its full context chain.
    pub fn from_outcome(step: impl Into<String>, outcome: anyhow::Result<Value>) -> Self {
        match outcome {
            Ok(output) => Self::succeeded(step, output),
            Err(e) => Self::failed(step, format!("{e:#}")),
        }
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Aggregate of a sequential run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub agent_name: String,
    pub success: bool,
    pub steps: Vec<StepResult>,
    pub final_output: Option<Value>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    /// `success` is true only when every executed step succeeded;
    /// `final_output` is the last executed step's output.
    pub fn from_steps(
        agent_name: impl Into<String>,
        steps: Vec<StepResult>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let success = steps.iter().all(StepResult::success);
        let final_output = steps.last().and_then(|s| s.output.clone());
        Self {
            run_id: Uuid::new_v4(),
            agent_name: agent_name.into(),
            success,
            steps,
            final_output,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| !s.success)
    }
}
