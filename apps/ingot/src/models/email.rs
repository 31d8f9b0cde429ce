use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::llm_client::{FieldType, Schema, StructuredOutput};

/// Who the email is addressed to; drives tone and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientType {
    Hr,
    Cto,
    Ceo,
    Default,
}

const HR_MARKERS: &[&str] = &["hr", "recruit", "talent", "people"];
const CTO_MARKERS: &[&str] = &["cto", "vp eng", "engineering", "tech lead"];
const CEO_MARKERS: &[&str] = &["ceo", "founder", "co-founder", "president"];

impl RecipientType {
    /// Classifies a job title. Checked in order HR, CTO, CEO, so
    /// "VP Engineering & Talent Acquisition" is HR.
    pub fn from_role(role: &str) -> Self {
        let role = role.to_lowercase();
        let matches = |markers: &[&str]| markers.iter().any(|m| role.contains(m));
        if matches(HR_MARKERS) {
            Self::Hr
        } else if matches(CTO_MARKERS) {
            Self::Cto
        } else if matches(CEO_MARKERS) {
            Self::Ceo
        } else {
            Self::Default
        }
    }
}

impl fmt::Display for RecipientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Hr => "hr",
            Self::Cto => "cto",
            Self::Ceo => "ceo",
            Self::Default => "default",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McqQuestions {
    pub questions: Vec<String>,
}

impl StructuredOutput for McqQuestions {
    fn schema() -> Schema {
        Schema::new("McqQuestions").field("questions", FieldType::list(FieldType::String))
    }
}

/// Question → answer, as supplied by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McqAnswers {
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
    #[serde(default)]
    pub skipped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub subject_a: String,
    pub subject_b: String,
    pub body: String,
    #[serde(default)]
    pub followup_day3: String,
    #[serde(default)]
    pub followup_day7: String,
    /// Set by the writer from the recipient's role, not by the model.
    #[serde(default = "default_tone")]
    pub tone_adapted_for: RecipientType,
    #[serde(default)]
    pub can_spam_footer: String,
}

fn default_tone() -> RecipientType {
    RecipientType::Default
}

impl StructuredOutput for EmailDraft {
    fn schema() -> Schema {
        Schema::new("EmailDraft")
            .field("subject_a", FieldType::String)
            .field("subject_b", FieldType::String)
            .field("body", FieldType::String)
            .field("followup_day3", FieldType::optional(FieldType::String))
            .field("followup_day7", FieldType::optional(FieldType::String))
    }
}
