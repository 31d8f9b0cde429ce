use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::dispatcher::DEFAULT_MAX_WORKERS;
use crate::llm_client::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Anthropic,
    /// Any OpenAI-compatible chat-completions endpoint, Ollama included.
    OpenAi,
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" | "ollama" => Ok(Self::OpenAi),
            other => Err(format!("unknown provider '{other}' (expected anthropic or openai)")),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if a value is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_provider: LlmProvider,
    pub llm_model: String,
    pub llm_base_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_max_retries: u32,
    pub llm_base_delay: Duration,
    pub llm_max_delay: Duration,
    pub llm_timeout: Duration,
    pub llm_max_tokens: u32,
    /// Agent name → model, overriding `llm_model` for that agent.
    pub agent_models: HashMap<String, String>,
    pub dispatch_max_workers: usize,
    pub port: u16,
    /// 0 = warn, 1 = info, 2+ = debug. `RUST_LOG` takes precedence.
    pub verbosity: u8,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let llm_provider = parse_or(&var, "LLM_PROVIDER", LlmProvider::OpenAi)?;
        let llm_api_key = var("LLM_API_KEY");
        if llm_provider == LlmProvider::Anthropic && llm_api_key.is_none() {
            bail!("Required environment variable 'LLM_API_KEY' is not set (LLM_PROVIDER=anthropic)");
        }

        let llm_base_delay = Duration::from_millis(parse_or(&var, "LLM_BASE_DELAY_MS", 2_000)?);
        let llm_max_delay = Duration::from_millis(parse_or(&var, "LLM_MAX_DELAY_MS", 30_000)?);
        if llm_max_delay < llm_base_delay {
            bail!("LLM_MAX_DELAY_MS must not be below LLM_BASE_DELAY_MS");
        }

        Ok(Config {
            llm_provider,
            llm_model: var("LLM_MODEL").unwrap_or_else(|| "llama3.1".to_string()),
            llm_base_url: var("LLM_BASE_URL"),
            llm_api_key,
            llm_max_retries: parse_or(&var, "LLM_MAX_RETRIES", 3)?,
            llm_base_delay,
            llm_max_delay,
            llm_timeout: Duration::from_secs(parse_or(&var, "LLM_TIMEOUT_SECS", 120)?),
            llm_max_tokens: parse_or(&var, "LLM_MAX_TOKENS", 4096)?,
            agent_models: match var("AGENT_MODELS") {
                Some(raw) => parse_agent_models(&raw)?,
                None => HashMap::new(),
            },
            dispatch_max_workers: parse_or(&var, "DISPATCH_MAX_WORKERS", DEFAULT_MAX_WORKERS)?,
            port: parse_or(&var, "PORT", 8080)?,
            verbosity: parse_or(&var, "VERBOSITY", 1)?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.llm_max_retries, self.llm_base_delay, self.llm_max_delay)
    }

    /// Default tracing directive when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
    }
}

/// `research=claude-3-5-sonnet,writer=llama3.1`
fn parse_agent_models(raw: &str) -> Result<HashMap<String, String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| -> Result<(String, String)> {
            let (agent, model) = pair
                .split_once('=')
                .with_context(|| format!("AGENT_MODELS entry '{pair}' is not agent=model"))?;
            let (agent, model) = (agent.trim(), model.trim());
            if agent.is_empty() || model.is_empty() {
                bail!("AGENT_MODELS entry '{pair}' is not agent=model");
            }
            Ok((agent.to_string(), model.to_string()))
        })
        .collect()
}
