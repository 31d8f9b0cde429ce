//! Concrete outreach agents. Agents never call each other: anything one needs
//! from another arrives through params, placed there by the caller.

pub mod matcher;
mod prompts;
pub mod research;
pub mod writer;

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::llm_client::prompts::output_instructions;
use crate::llm_client::{CompletionRequest, Message, StructuredOutput};
use crate::pipeline::AgentDeps;
use crate::registry::AgentRegistry;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("valid regex"));

pub fn register_all(registry: &mut AgentRegistry) {
    research::register(registry);
    matcher::register(registry);
    writer::register(registry);
}

/// Reads `params[key]`; absent and `null` are both "missing".
pub(crate) fn required<T: DeserializeOwned>(params: &Value, key: &str) -> anyhow::Result<T> {
    optional(params, key)?.with_context(|| format!("missing parameter `{key}`"))
}

pub(crate) fn optional<T: DeserializeOwned>(params: &Value, key: &str) -> anyhow::Result<Option<T>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .with_context(|| format!("invalid parameter `{key}`")),
    }
}

/// Output of an earlier step, threaded into params under the step's name.
pub(crate) fn prior<T: DeserializeOwned>(params: &Value, step: &str) -> anyhow::Result<T> {
    match params.get(step) {
        None | Some(Value::Null) => anyhow::bail!("step `{step}` has not run; pass its output as `{step}`"),
        Some(value) => serde_json::from_value(value.clone())
            .with_context(|| format!("output of step `{step}` is malformed")),
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize prompt input")
}

/// Fills `{name}` placeholders in a single pass; inserted text is never rescanned.
/// Placeholders without a value are left untouched.
pub(crate) fn fill(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
        })
        .into_owned()
}

/// One structured completion with the agent's system prompt.
pub(crate) async fn ask<T: StructuredOutput>(
    deps: &AgentDeps,
    system: &str,
    prompt: String,
) -> anyhow::Result<T> {
    let schema = T::schema();
    if deps.verbosity >= 2 {
        debug!(agent = %deps.agent_name, schema = schema.name(), "Prompt:\n{}", prompt);
    }

    let request = CompletionRequest::for_output::<T>(vec![
        Message::system(format!("{system}\n\n{}", output_instructions(&schema))),
        Message::user(prompt),
    ])
    .with_output_tool();

    deps.llm
        .complete(&request)
        .await
        .with_context(|| format!("{} completion failed", schema.name()))
}

/// Bulleted list, or a placeholder when empty.
pub(crate) fn bullets(items: &[String]) -> String {
    if items.is_empty() {
        return "  (none)".to_string();
    }
    items
        .iter()
        .map(|item| format!("  - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
