use serde::{Deserialize, Serialize};

use crate::llm_client::{FieldType, Schema, StructuredOutput};

pub const MAX_TALKING_POINTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub company_name: String,
    #[serde(default)]
    pub product_description: String,
    /// Funding stage, size, growth.
    #[serde(default)]
    pub company_signals: Vec<String>,
}

impl StructuredOutput for CompanyProfile {
    fn schema() -> Schema {
        Schema::new("CompanyProfile")
            .field("company_name", FieldType::String)
            .field("product_description", FieldType::optional(FieldType::String))
            .field(
                "company_signals",
                FieldType::optional(FieldType::list(FieldType::String)),
            )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonProfile {
    pub person_name: String,
    #[serde(default)]
    pub person_role: String,
    #[serde(default)]
    pub person_background: String,
}

impl StructuredOutput for PersonProfile {
    fn schema() -> Schema {
        Schema::new("PersonProfile")
            .field("person_name", FieldType::String)
            .field("person_role", FieldType::optional(FieldType::String))
            .field("person_background", FieldType::optional(FieldType::String))
    }
}

/// Recent events worth mentioning: funding, hiring posts, launches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    pub signals: Vec<String>,
}

impl StructuredOutput for Signals {
    fn schema() -> Schema {
        Schema::new("Signals").field("signals", FieldType::list(FieldType::String))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalkingPoints {
    pub talking_points: Vec<String>,
}

impl StructuredOutput for TalkingPoints {
    fn schema() -> Schema {
        Schema::new("TalkingPoints").field("talking_points", FieldType::list(FieldType::String))
    }
}

/// Everything the matcher and writer need to know about one lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelBrief {
    pub company_name: String,
    #[serde(default)]
    pub company_website: String,
    #[serde(default)]
    pub company_product_description: String,
    #[serde(default)]
    pub company_signals: Vec<String>,
    #[serde(default)]
    pub person_name: String,
    #[serde(default)]
    pub person_role: String,
    #[serde(default)]
    pub person_background: String,
    /// One to three.
    #[serde(default)]
    pub talking_points: Vec<String>,
}
