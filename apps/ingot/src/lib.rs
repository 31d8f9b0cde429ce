pub mod agents;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod llm_client;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod registry;
pub mod routes;
pub mod state;

#[cfg(test)]
mod test_support;
