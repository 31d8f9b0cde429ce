//! Writer agent: personalised cold email for one lead.
//!
//! Pipeline: generate_questions → draft → finalize
//!
//! Questions are optional. With `skip_questions` (or no `answers`) the draft is
//! written from the brief and match data alone.

use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::prompts::{
    DRAFT_PROMPT_TEMPLATE, MCQ_PROMPT_TEMPLATE, MCQ_SYSTEM, TONE_CEO, TONE_CTO, TONE_DEFAULT,
    TONE_HR, UNSUBSCRIBE_LINE, WRITER_SYSTEM,
};
use super::{ask, bullets, fill, optional, prior, required};
use crate::models::{
    EmailDraft, IntelBrief, MatchResult, McqAnswers, McqQuestions, RecipientType, UserProfile,
};
use crate::pipeline::{Agent, AgentDeps};
use crate::registry::AgentRegistry;

pub const NAME: &str = "writer";
const STEPS: &[&str] = &["generate_questions", "draft", "finalize"];

const MAX_QUESTIONS: usize = 3;
/// Shorter bodies are almost always generic.
const MIN_BODY_CHARS: usize = 100;

pub struct WriterAgent;

pub fn register(registry: &mut AgentRegistry) {
    registry.register(NAME, Arc::new(WriterAgent));
}

#[async_trait]
impl Agent for WriterAgent {
    fn name(&self) -> &str {
        NAME
    }

    fn steps(&self) -> &[&'static str] {
        STEPS
    }

    async fn execute(&self, step: &str, deps: &AgentDeps, params: &Value) -> anyhow::Result<Value> {
        let output = match step {
            "generate_questions" => serde_json::to_value(generate_questions(deps, params).await?)?,
            "draft" => serde_json::to_value(draft(deps, params).await?)?,
            "finalize" => serde_json::to_value(finalize(params)?)?,
            other => bail!("unhandled step '{other}'"),
        };
        Ok(output)
    }
}

#[derive(Debug, Serialize)]
struct QuestionSet {
    questions: Vec<String>,
    skipped: bool,
}

async fn generate_questions(deps: &AgentDeps, params: &Value) -> anyhow::Result<QuestionSet> {
    if optional::<bool>(params, "skip_questions")?.unwrap_or(false) {
        return Ok(QuestionSet {
            questions: Vec::new(),
            skipped: true,
        });
    }

    let brief: IntelBrief = required(params, "intel_brief")?;
    let signals: Vec<&str> = brief.company_signals.iter().take(3).map(String::as_str).collect();
    let prompt = fill(
        MCQ_PROMPT_TEMPLATE,
        &[
            ("company_name", brief.company_name.as_str()),
            ("product", brief.company_product_description.as_str()),
            ("person_name", brief.person_name.as_str()),
            ("person_role", brief.person_role.as_str()),
            ("signals", signals.join("; ").as_str()),
            ("talking_points", bullets(&brief.talking_points).as_str()),
        ],
    );
    let generated: McqQuestions = ask(deps, MCQ_SYSTEM, prompt).await?;

    let questions: Vec<String> = generated
        .questions
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .take(MAX_QUESTIONS)
        .collect();
    if questions.is_empty() {
        bail!("model produced no questions for {}", brief.company_name);
    }
    Ok(QuestionSet {
        questions,
        skipped: false,
    })
}

async fn draft(deps: &AgentDeps, params: &Value) -> anyhow::Result<EmailDraft> {
    let brief: IntelBrief = required(params, "intel_brief")?;
    let profile: UserProfile = required(params, "profile")?;
    let match_result: MatchResult = required(params, "match_result")?;
    let answers: McqAnswers = optional(params, "answers")?.unwrap_or(McqAnswers {
        skipped: true,
        ..McqAnswers::default()
    });

    let recipient = RecipientType::from_role(&brief.person_role);
    let prompt = fill(
        DRAFT_PROMPT_TEMPLATE,
        &[
            ("tone_label", recipient.to_string().to_uppercase().as_str()),
            ("tone_guidance", tone_guidance(recipient)),
            ("sender", describe_sender(&profile).as_str()),
            ("recipient", describe_recipient(&brief).as_str()),
            ("talking_points", numbered(&brief.talking_points).as_str()),
            ("value_proposition", match_result.value_proposition.as_str()),
            ("answers", describe_answers(&answers).as_str()),
        ],
    );

    let mut email: EmailDraft = ask(deps, WRITER_SYSTEM, prompt).await?;
    if email.body.trim().chars().count() < MIN_BODY_CHARS {
        bail!(
            "email body is too short to be personalised (< {} chars)",
            MIN_BODY_CHARS
        );
    }
    email.tone_adapted_for = recipient;
    email.can_spam_footer = String::new();

    info!(
        "Drafted email for {} ({} tone)",
        brief.company_name, email.tone_adapted_for
    );
    Ok(email)
}

/// Attaches the CAN-SPAM footer. Sender identity falls back to the profile name.
fn finalize(params: &Value) -> anyhow::Result<EmailDraft> {
    let mut email: EmailDraft = prior(params, "draft")?;
    let sender_email: String = required(params, "sender_email")?;
    let sender_name = match optional::<String>(params, "sender_name")? {
        Some(name) if !name.trim().is_empty() => name,
        _ => optional::<UserProfile>(params, "profile")?
            .map(|p| p.name)
            .unwrap_or_default(),
    };
    let physical_address: String = optional(params, "physical_address")?.unwrap_or_default();

    email.can_spam_footer = can_spam_footer(&sender_name, &sender_email, &physical_address)?;
    Ok(email)
}

pub fn can_spam_footer(
    sender_name: &str,
    sender_email: &str,
    physical_address: &str,
) -> anyhow::Result<String> {
    let physical_address = physical_address.trim();
    if physical_address.is_empty() {
        warn!("Refusing to finalise email without a physical mailing address");
        bail!("CAN-SPAM footer needs a physical mailing address (`physical_address`)");
    }
    if sender_name.trim().is_empty() || sender_email.trim().is_empty() {
        bail!("CAN-SPAM footer needs the sender's name and email");
    }

    Ok([
        "---".to_string(),
        format!("This email was sent by {} <{}>.", sender_name.trim(), sender_email.trim()),
        physical_address.to_string(),
        String::new(),
        UNSUBSCRIBE_LINE.to_string(),
    ]
    .join("\n"))
}

fn tone_guidance(recipient: RecipientType) -> &'static str {
    match recipient {
        RecipientType::Hr => TONE_HR,
        RecipientType::Cto => TONE_CTO,
        RecipientType::Ceo => TONE_CEO,
        RecipientType::Default => TONE_DEFAULT,
    }
}

fn describe_sender(profile: &UserProfile) -> String {
    let skills: Vec<&str> = profile.skills.iter().take(8).map(String::as_str).collect();
    let experience: Vec<&str> = profile.experience.iter().take(3).map(String::as_str).collect();
    format!(
        "  Name: {}\n  Headline: {}\n  Skills: {}\n  Experience: {}",
        profile.name,
        profile.headline,
        skills.join(", "),
        experience.join("; ")
    )
}

fn describe_recipient(brief: &IntelBrief) -> String {
    let or = |value: &str, fallback: &str| {
        if value.trim().is_empty() {
            fallback.to_string()
        } else {
            value.to_string()
        }
    };
    format!(
        "  Name: {}\n  Role: {}\n  Company: {}\n  Product: {}\n  Contact background: {}",
        or(&brief.person_name, "the team"),
        or(&brief.person_role, "unknown"),
        brief.company_name,
        brief.company_product_description,
        brief.person_background
    )
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("  {}. {item}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_answers(answers: &McqAnswers) -> String {
    if answers.skipped || answers.answers.is_empty() {
        return "QUESTIONS: skipped; write from the brief and match data alone.".to_string();
    }
    let mut section = String::from("ANSWERS (the sender's personalisation input):");
    for (question, answer) in &answers.answers {
        section.push_str(&format!("\n  Q: {question}\n  A: {answer}"));
    }
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::test_support::{deps, offline_deps, ScriptedBackend};

    const LONG_BODY: &str = "Hi Wile, I saw Acme just opened three Rust roles to speed up anvil \
        delivery. I spent four years building low-latency Tokio services and would love to help.";

    fn params() -> Value {
        json!({
            "intel_brief": {
                "company_name": "Acme",
                "company_product_description": "Anvils as a service",
                "company_signals": ["Series A", "Hiring Rust engineers"],
                "person_name": "Wile",
                "person_role": "CTO",
                "talking_points": ["Rust hiring push"]
            },
            "profile": {"name": "Ada", "skills": ["Rust", "Tokio"]},
            "match_result": {
                "match_score": 88,
                "value_proposition": "Has shipped Tokio services at scale",
                "confidence_level": "high"
            },
            "sender_email": "ada@example.com",
            "physical_address": "1 Analytical Way, London"
        })
    }

    fn draft_reply(body: &str) -> String {
        json!({
            "subject_a": "RE: Acme Rust hiring",
            "subject_b": "Question about anvil latency at Acme",
            "body": body,
            "followup_day3": "Following up with a benchmark idea.",
            "followup_day7": "Last nudge."
        })
        .to_string()
    }

    #[test]
    fn test_footer_has_all_three_elements() {
        let footer = can_spam_footer("Ada", "ada@example.com", " 1 Analytical Way ").unwrap();
        assert_eq!(
            footer,
            "---\nThis email was sent by Ada <ada@example.com>.\n1 Analytical Way\n\n\
             Not interested? Reply with 'unsubscribe' to be removed from future outreach."
        );
    }

    #[test]
    fn test_footer_requires_physical_address() {
        let err = can_spam_footer("Ada", "ada@example.com", "   ").unwrap_err();
        assert!(err.to_string().contains("physical mailing address"));
    }

    #[tokio::test]
    async fn test_skip_questions_makes_no_call() {
        let backend = ScriptedBackend::replies(&[]);
        let mut params = params();
        params["skip_questions"] = json!(true);

        let result = WriterAgent
            .run_step("generate_questions", &deps(backend.clone()), &params)
            .await
            .unwrap();
        assert!(result.success());
        assert_eq!(result.output(), Some(&json!({"questions": [], "skipped": true})));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_questions_are_capped() {
        let backend = ScriptedBackend::replies(&[
            "<questions>\nWhat draws you to Acme's anvils?\nWhat is the goal?\nWhich project?\nOne more?\n</questions>",
        ]);
        let result = WriterAgent
            .run_step("generate_questions", &deps(backend), &params())
            .await
            .unwrap();
        assert!(result.success(), "{:?}", result.error());
        let questions = result.output().unwrap()["questions"].as_array().unwrap().len();
        assert_eq!(questions, 3);
    }

    #[tokio::test]
    async fn test_full_run_tones_for_cto_and_adds_footer() {
        let backend = ScriptedBackend::replies(&[
            r#"{"questions": ["What draws you to Acme's Rust hiring push?"]}"#,
            draft_reply(LONG_BODY).as_str(),
        ]);

        let run = WriterAgent
            .run(&deps(backend.clone()), &params(), None)
            .await
            .unwrap();

        assert!(run.success, "{:?}", run.failed_step());
        let email: EmailDraft = serde_json::from_value(run.final_output.unwrap()).unwrap();
        assert_eq!(email.tone_adapted_for, RecipientType::Cto);
        assert!(email.can_spam_footer.contains("This email was sent by Ada <ada@example.com>."));
        assert!(email.can_spam_footer.contains("1 Analytical Way, London"));

        let requests = backend.requests();
        let prompt = &requests[1].messages()[1].content;
        assert!(prompt.contains("TONE GUIDANCE (CTO)"));
        assert!(prompt.contains("QUESTIONS: skipped"));
        assert!(prompt.contains("1. Rust hiring push"));
    }

    #[tokio::test]
    async fn test_short_body_is_rejected() {
        let backend = ScriptedBackend::replies(&[draft_reply("Hire me.").as_str()]);
        let result = WriterAgent
            .run_step("draft", &deps(backend), &params())
            .await
            .unwrap();
        assert!(!result.success());
        assert!(result.error().unwrap().contains("too short"));
    }

    #[tokio::test]
    async fn test_answers_reach_the_prompt() {
        let backend = ScriptedBackend::replies(&[draft_reply(LONG_BODY).as_str()]);
        let mut params = params();
        params["answers"] = json!({"answers": {"What is the goal?": "An intro call"}});

        WriterAgent
            .run_step("draft", &deps(backend.clone()), &params)
            .await
            .unwrap();
        let requests = backend.requests();
        let prompt = &requests[0].messages()[1].content;
        assert!(prompt.contains("Q: What is the goal?\n  A: An intro call"));
    }

    #[tokio::test]
    async fn test_user_text_is_not_treated_as_placeholder() {
        let backend = ScriptedBackend::replies(&[draft_reply(LONG_BODY).as_str()]);
        let mut params = params();
        params["profile"]["headline"] = json!("I write {answers} and {talking_points}");

        WriterAgent
            .run_step("draft", &deps(backend.clone()), &params)
            .await
            .unwrap();
        let requests = backend.requests();
        let prompt = &requests[0].messages()[1].content;
        assert!(prompt.contains("Headline: I write {answers} and {talking_points}"));
        assert_eq!(prompt.matches("QUESTIONS: skipped").count(), 1);
    }

    #[tokio::test]
    async fn test_finalize_without_address_fails() {
        let mut params = params();
        params["draft"] = serde_json::from_str(&draft_reply(LONG_BODY)).unwrap();
        params["physical_address"] = Value::Null;

        let result = WriterAgent
            .run_step("finalize", &offline_deps(), &params)
            .await
            .unwrap();
        assert!(!result.success());
        assert!(result.error().unwrap().contains("physical mailing address"));
    }
}
