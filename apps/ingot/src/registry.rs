//! Name → agent lookup shared by the orchestrator and the HTTP layer.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::pipeline::Agent;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Agent '{name}' not in registry. Registered: [{}]", .registered.join(", "))]
    NotFound {
        name: String,
        registered: Vec<String>,
    },
}

#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering an existing name replaces the previous agent.
    pub fn register(&mut self, name: impl Into<String>, agent: Arc<dyn Agent>) {
        let name = name.into();
        if self.agents.insert(name.clone(), agent).is_some() {
            debug!("Replaced agent '{}' in registry", name);
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Agent>, RegistryError> {
        self.agents
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
                registered: self.list(),
            })
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
