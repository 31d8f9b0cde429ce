//! Matcher agent: scores the sender's profile against a lead's `IntelBrief`.
//!
//! Pipeline: load_profile → compare → score

use std::sync::Arc;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::prompts::{COMPARE_PROMPT_TEMPLATE, MATCHER_SYSTEM, SCORE_PROMPT_TEMPLATE};
use super::{ask, fill, prior, required, to_json};
use crate::models::{MatchAnalysis, MatchResult, UserProfile};
use crate::pipeline::{Agent, AgentDeps};
use crate::registry::AgentRegistry;

pub const NAME: &str = "matcher";
const STEPS: &[&str] = &["load_profile", "compare", "score"];

pub struct MatcherAgent;

pub fn register(registry: &mut AgentRegistry) {
    registry.register(NAME, Arc::new(MatcherAgent));
}

#[async_trait]
impl Agent for MatcherAgent {
    fn name(&self) -> &str {
        NAME
    }

    fn steps(&self) -> &[&'static str] {
        STEPS
    }

    async fn execute(&self, step: &str, deps: &AgentDeps, params: &Value) -> anyhow::Result<Value> {
        let output = match step {
            "load_profile" => serde_json::to_value(load_profile(params)?)?,
            "compare" => serde_json::to_value(compare(deps, params).await?)?,
            "score" => serde_json::to_value(score(deps, params).await?)?,
            other => bail!("unhandled step '{other}'"),
        };
        Ok(output)
    }
}

/// Validates and tidies the `profile` param: trims entries, drops blanks and
/// duplicate skills (case-insensitive, first spelling wins).
fn load_profile(params: &Value) -> anyhow::Result<UserProfile> {
    let mut profile: UserProfile = required(params, "profile")?;

    profile.name = profile.name.trim().to_string();
    if profile.name.is_empty() {
        bail!("profile has no name");
    }

    let mut seen = Vec::with_capacity(profile.skills.len());
    profile.skills = profile
        .skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| {
            let key = s.to_lowercase();
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        })
        .collect();
    for entries in [&mut profile.experience, &mut profile.education, &mut profile.projects] {
        entries.retain(|e| !e.trim().is_empty());
    }

    if profile.skills.is_empty() && profile.experience.is_empty() {
        bail!("profile for {} lists no skills or experience", profile.name);
    }
    Ok(profile)
}

async fn compare(deps: &AgentDeps, params: &Value) -> anyhow::Result<MatchAnalysis> {
    let profile: UserProfile = prior(params, "load_profile")?;
    let brief: Value = required(params, "intel_brief")?;

    let prompt = fill(
        COMPARE_PROMPT_TEMPLATE,
        &[("profile_json", to_json(&profile)?.as_str()), ("brief_json", to_json(&brief)?.as_str())],
    );
    ask(deps, MATCHER_SYSTEM, prompt).await
}

async fn score(deps: &AgentDeps, params: &Value) -> anyhow::Result<MatchResult> {
    let profile: UserProfile = prior(params, "load_profile")?;
    let analysis: MatchAnalysis = prior(params, "compare")?;
    let brief: Value = required(params, "intel_brief")?;

    let prompt = fill(
        SCORE_PROMPT_TEMPLATE,
        &[
            ("profile_json", to_json(&profile)?.as_str()),
            ("brief_json", to_json(&brief)?.as_str()),
            ("analysis_json", to_json(&analysis)?.as_str()),
        ],
    );
    let result: MatchResult = ask(deps, MATCHER_SYSTEM, prompt).await?;

    let result = check_score(result)?;
    info!(
        "Match score {:.0} ({}) for {}",
        result.match_score, result.confidence_level, profile.name
    );
    Ok(result)
}

/// Score must lie in 0–100; confidence is normalised to high/medium/low.
fn check_score(mut result: MatchResult) -> anyhow::Result<MatchResult> {
    if !(0.0..=100.0).contains(&result.match_score) {
        bail!("match score {} is outside 0-100", result.match_score);
    }
    let confidence = result.confidence().map_err(|e| anyhow!(e))?;
    result.confidence_level = confidence.to_string();
    if result.value_proposition.trim().is_empty() {
        bail!("value proposition is empty");
    }
    Ok(result)
}
