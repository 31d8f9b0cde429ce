use std::collections::HashMap;
use std::sync::Arc;

use crate::llm_client::LlmClient;

/// Everything a step may touch. Built fresh for each invocation via [`AgentDeps::for_agent`].
#[derive(Clone)]
pub struct AgentDeps {
    pub llm: LlmClient,
    pub http: reqwest::Client,
    pub verbosity: u8,
    pub agent_name: String,
    model_overrides: Arc<HashMap<String, String>>,
}

impl AgentDeps {
    pub fn new(llm: LlmClient, http: reqwest::Client) -> Self {
        Self {
            llm,
            http,
            verbosity: 0,
            agent_name: String::new(),
            model_overrides: Arc::new(HashMap::new()),
        }
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Per-agent model names, keyed by agent name.
    pub fn with_model_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.model_overrides = Arc::new(overrides);
        self
    }

    /// Bundle for one run of `agent_name`, with its model override applied.
    pub fn for_agent(&self, agent_name: &str) -> Self {
        let llm = match self.model_overrides.get(agent_name) {
            Some(model) => self.llm.with_model(model.clone()),
            None => self.llm.clone(),
        };
        Self {
            llm,
            http: self.http.clone(),
            verbosity: self.verbosity,
            agent_name: agent_name.to_string(),
            model_overrides: Arc::clone(&self.model_overrides),
        }
    }
}
