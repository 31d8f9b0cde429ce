use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ingot::agents;
use ingot::config::{Config, LlmProvider};
use ingot::llm_client::anthropic::AnthropicBackend;
use ingot::llm_client::openai::OpenAiBackend;
use ingot::llm_client::{Backend, LlmClient};
use ingot::orchestrator::Orchestrator;
use ingot::pipeline::AgentDeps;
use ingot::registry::AgentRegistry;
use ingot::routes::build_router;
use ingot::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), config.log_level()))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting INGOT v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm_http = reqwest::Client::builder()
        .timeout(config.llm_timeout)
        .build()
        .context("Failed to build LLM HTTP client")?;
    let backend: Arc<dyn Backend> = match config.llm_provider {
        LlmProvider::Anthropic => Arc::new(AnthropicBackend::new(
            llm_http,
            config.llm_api_key.clone().context("LLM_API_KEY is required for anthropic")?,
            config.llm_base_url.clone(),
            config.llm_max_tokens,
        )),
        LlmProvider::OpenAi => Arc::new(OpenAiBackend::new(
            llm_http,
            config.llm_api_key.clone(),
            config.llm_base_url.clone(),
            config.llm_max_tokens,
        )),
    };
    let llm = LlmClient::new(backend, config.llm_model.clone())
        .with_retry_policy(config.retry_policy())
        .with_call_timeout(config.llm_timeout);
    info!(
        "LLM client initialized (provider: {}, model: {})",
        llm.provider(),
        llm.model()
    );

    // Agents fetch company pages through their own client
    let agent_http = reqwest::Client::builder()
        .user_agent(concat!("ingot/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build agent HTTP client")?;

    let mut registry = AgentRegistry::new();
    agents::register_all(&mut registry);
    info!("Registered agents: {}", registry.list().join(", "));

    let deps = AgentDeps::new(llm, agent_http)
        .with_verbosity(config.verbosity)
        .with_model_overrides(config.agent_models.clone());

    let state = AppState {
        orchestrator: Arc::new(Orchestrator::new(Arc::new(registry), deps)),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
