//! Research agent: builds an `IntelBrief` for one lead.
//!
//! Pipeline: fetch_company → fetch_person → identify_signals → synthesise

use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::info;

use super::prompts::{
    FETCH_COMPANY_PROMPT_TEMPLATE, FETCH_PERSON_PROMPT_TEMPLATE, IDENTIFY_SIGNALS_PROMPT_TEMPLATE,
    RESEARCH_SYSTEM, SYNTHESISE_PROMPT_TEMPLATE,
};
use super::{ask, fill, optional, prior, required, to_json};
use crate::models::{
    CompanyProfile, IntelBrief, PersonProfile, Signals, TalkingPoints, MAX_TALKING_POINTS,
};
use crate::pipeline::{Agent, AgentDeps};
use crate::registry::AgentRegistry;

pub const NAME: &str = "research";
const STEPS: &[&str] = &["fetch_company", "fetch_person", "identify_signals", "synthesise"];

/// Page text beyond this is dropped before prompting.
const MAX_SOURCE_CHARS: usize = 8_000;

static MARKUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script.*?</script>|<style.*?</style>|<[^>]+>").expect("valid regex")
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

pub struct ResearchAgent;

pub fn register(registry: &mut AgentRegistry) {
    registry.register(NAME, Arc::new(ResearchAgent));
}

#[async_trait]
impl Agent for ResearchAgent {
    fn name(&self) -> &str {
        NAME
    }

    fn steps(&self) -> &[&'static str] {
        STEPS
    }

    async fn execute(&self, step: &str, deps: &AgentDeps, params: &Value) -> anyhow::Result<Value> {
        let output = match step {
            "fetch_company" => serde_json::to_value(fetch_company(deps, params).await?)?,
            "fetch_person" => serde_json::to_value(fetch_person(deps, params).await?)?,
            "identify_signals" => serde_json::to_value(identify_signals(deps, params).await?)?,
            "synthesise" => serde_json::to_value(synthesise(deps, params).await?)?,
            other => bail!("unhandled step '{other}'"),
        };
        Ok(output)
    }
}

async fn fetch_company(deps: &AgentDeps, params: &Value) -> anyhow::Result<CompanyProfile> {
    let company_name: String = required(params, "company_name")?;

    let source_text = match optional::<String>(params, "source_text")? {
        Some(text) => text,
        None => match optional::<String>(params, "company_website")? {
            Some(url) => fetch_page_text(&deps.http, &url).await?,
            None => String::new(),
        },
    };
    let source_text = if source_text.trim().is_empty() {
        "(none supplied)".to_string()
    } else {
        source_text.chars().take(MAX_SOURCE_CHARS).collect()
    };

    let prompt = fill(
        FETCH_COMPANY_PROMPT_TEMPLATE,
        &[("company_name", company_name.as_str()), ("source_text", source_text.as_str())],
    );
    let mut profile: CompanyProfile = ask(deps, RESEARCH_SYSTEM, prompt).await?;
    if profile.company_name.trim().is_empty() {
        profile.company_name = company_name;
    }
    Ok(profile)
}

async fn fetch_person(deps: &AgentDeps, params: &Value) -> anyhow::Result<PersonProfile> {
    let person_name: String = required(params, "person_name")?;
    let person_role: String = optional(params, "person_role")?.unwrap_or_default();
    let company_name: String = required(params, "company_name")?;
    let notes: String = optional(params, "person_notes")?.unwrap_or_default();

    let prompt = fill(
        FETCH_PERSON_PROMPT_TEMPLATE,
        &[
            ("person_name", person_name.as_str()),
            ("person_role", if person_role.is_empty() { "role unknown" } else { person_role.as_str() }),
            ("company_name", company_name.as_str()),
            ("person_notes", if notes.is_empty() { "(none supplied)" } else { notes.as_str() }),
        ],
    );
    let mut person: PersonProfile = ask(deps, RESEARCH_SYSTEM, prompt).await?;
    if person.person_name.trim().is_empty() {
        person.person_name = person_name;
    }
    if person.person_role.trim().is_empty() {
        person.person_role = person_role;
    }
    Ok(person)
}

async fn identify_signals(deps: &AgentDeps, params: &Value) -> anyhow::Result<Signals> {
    let company: CompanyProfile = prior(params, "fetch_company")?;
    let person: PersonProfile = prior(params, "fetch_person")?;

    let prompt = fill(
        IDENTIFY_SIGNALS_PROMPT_TEMPLATE,
        &[("company_json", to_json(&company)?.as_str()), ("person_json", to_json(&person)?.as_str())],
    );
    ask(deps, RESEARCH_SYSTEM, prompt).await
}

async fn synthesise(deps: &AgentDeps, params: &Value) -> anyhow::Result<IntelBrief> {
    let company: CompanyProfile = prior(params, "fetch_company")?;
    let person: PersonProfile = prior(params, "fetch_person")?;
    let signals: Signals = prior(params, "identify_signals")?;
    let website: String = optional(params, "company_website")?.unwrap_or_default();

    let prompt = fill(
        SYNTHESISE_PROMPT_TEMPLATE,
        &[
            ("company_json", to_json(&company)?.as_str()),
            ("person_json", to_json(&person)?.as_str()),
            ("signals_json", to_json(&signals)?.as_str()),
        ],
    );
    let points: TalkingPoints = ask(deps, RESEARCH_SYSTEM, prompt).await?;

    let brief = build_brief(company, person, signals, points, website)?;
    info!(
        "Intel brief ready for {} ({} talking points)",
        brief.company_name,
        brief.talking_points.len()
    );
    Ok(brief)
}

fn build_brief(
    company: CompanyProfile,
    person: PersonProfile,
    signals: Signals,
    points: TalkingPoints,
    company_website: String,
) -> anyhow::Result<IntelBrief> {
    let talking_points: Vec<String> = points
        .talking_points
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .take(MAX_TALKING_POINTS)
        .collect();
    if talking_points.is_empty() {
        bail!("model produced no talking points for {}", company.company_name);
    }

    let mut company_signals = company.company_signals;
    for signal in signals.signals {
        if !company_signals.contains(&signal) {
            company_signals.push(signal);
        }
    }

    Ok(IntelBrief {
        company_name: company.company_name,
        company_website,
        company_product_description: company.product_description,
        company_signals,
        person_name: person.person_name,
        person_role: person.person_role,
        person_background: person.person_background,
        talking_points,
    })
}

async fn fetch_page_text(http: &reqwest::Client, url: &str) -> anyhow::Result<String> {
    let html = http
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .with_context(|| format!("fetching {url}"))?
        .text()
        .await
        .with_context(|| format!("reading body of {url}"))?;
    Ok(page_text(&html))
}

fn page_text(html: &str) -> String {
    let stripped = MARKUP.replace_all(html, " ");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}
