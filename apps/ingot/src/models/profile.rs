use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::llm_client::{FieldType, Schema, StructuredOutput};

/// The sender, as extracted from their resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Free text, e.g. "Senior SWE at Stripe 2021-2023".
    #[serde(default)]
    pub experience: Vec<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub resume_raw_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAnalysis {
    #[serde(default)]
    pub overlapping_skills: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    pub summary: String,
}

impl StructuredOutput for MatchAnalysis {
    fn schema() -> Schema {
        Schema::new("MatchAnalysis")
            .field(
                "overlapping_skills",
                FieldType::optional(FieldType::list(FieldType::String)),
            )
            .field("gaps", FieldType::optional(FieldType::list(FieldType::String)))
            .field("summary", FieldType::String)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl FromStr for ConfidenceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown confidence level '{other}'")),
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        f.write_str(label)
    }
}

/// Matcher output. The confidence level arrives as free text and is
/// normalised by the `score` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_score: f64,
    /// Specific to this company and role.
    pub value_proposition: String,
    pub confidence_level: String,
}

impl StructuredOutput for MatchResult {
    fn schema() -> Schema {
        Schema::new("MatchResult")
            .field("match_score", FieldType::Float)
            .field("value_proposition", FieldType::String)
            .field("confidence_level", FieldType::String)
    }
}

impl MatchResult {
    pub fn confidence(&self) -> Result<ConfidenceLevel, String> {
        self.confidence_level.parse()
    }
}
