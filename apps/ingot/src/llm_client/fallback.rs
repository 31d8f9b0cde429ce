//! Tag-delimited fallback extraction for backends that ignore tool calls and
//! do not emit clean JSON.
//!
//! Flat schemas only: fields whose concrete type is a nested object are never
//! extracted, so a required nested field always fails validation on this path.
//! List fields are built by splitting the tag body on newlines.
//!
//! ```text
//! <company_name>Acme Corp</company_name>
//! <skills>Python
//! Go
//! Rust</skills>
//! ```

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::llm_client::schema::{FieldType, Schema};
use crate::llm_client::ValidationError;

/// Extracts `<field>…</field>` spans for every schema field and validates the
/// assembled record. Fields without a span are left absent.
pub fn extract_tagged<T: DeserializeOwned>(text: &str, schema: &Schema) -> Result<T, ValidationError> {
    let mut data = Map::new();

    for field in schema.fields() {
        let concrete = field.ty.concrete();
        if matches!(concrete, FieldType::Object(_)) {
            continue;
        }

        let Some(captured) = find_tag(text, &field.name)
            .map_err(|e| ValidationError::new(schema.name(), e, text))?
        else {
            continue;
        };

        let value = match concrete {
            FieldType::List(_) => Value::Array(
                captured
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(|line| Value::String(line.to_string()))
                    .collect(),
            ),
            _ => Value::String(captured.to_string()),
        };
        data.insert(field.name.clone(), value);
    }

    schema
        .instantiate(Value::Object(data))
        .map_err(|reason| {
            ValidationError::new(schema.name(), format!("tag fallback: {reason}"), text)
        })
}

/// Returns the trimmed body of the first `<tag>…</tag>` span, across newlines.
fn find_tag<'t>(text: &'t str, tag: &str) -> Result<Option<&'t str>, String> {
    let escaped = regex::escape(tag);
    let pattern = Regex::new(&format!(r"(?s)<{escaped}>(.*?)</{escaped}>"))
        .map_err(|e| format!("invalid tag pattern for `{tag}`: {e}"))?;
    Ok(pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim()))
}
