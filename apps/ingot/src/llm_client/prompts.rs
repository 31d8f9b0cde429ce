// Shared prompt fragments. Each agent keeps its own task prompts next to it;
// this file holds the output-format instructions every structured call needs.

use crate::llm_client::schema::{FieldType, Schema};

/// System prompt fragment that asks for a single JSON object.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    Respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT include explanations or apologies.";

/// Accepted by the tag fallback when a model cannot produce JSON.
pub const TAG_FORMAT_HINT: &str = "If you cannot produce JSON, wrap each field in \
    <field_name>...</field_name> tags instead, one list item per line.";

/// Describes the expected fields so models without tool calling still know the shape.
pub fn output_instructions(schema: &Schema) -> String {
    let fields = schema
        .fields()
        .iter()
        .map(|f| {
            let requirement = if f.is_required() { "required" } else { "optional" };
            format!("- {} ({}, {})", f.name, describe(&f.ty), requirement)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{JSON_ONLY_SYSTEM}\n\nReturn a `{}` object with these fields:\n{fields}\n\n{TAG_FORMAT_HINT}",
        schema.name()
    )
}

fn describe(ty: &FieldType) -> String {
    match ty {
        FieldType::String => "string".to_string(),
        FieldType::Integer => "integer".to_string(),
        FieldType::Float => "number".to_string(),
        FieldType::Boolean => "boolean".to_string(),
        FieldType::Any => "any JSON value".to_string(),
        FieldType::Null => "null".to_string(),
        FieldType::List(inner) => format!("list of {}", describe(inner)),
        FieldType::Optional(inner) => describe(inner),
        FieldType::Union(variants) => variants
            .iter()
            .filter(|v| !matches!(v, FieldType::Null))
            .map(describe)
            .collect::<Vec<_>>()
            .join(" or "),
        FieldType::Object(schema) => format!("{} object", schema.name()),
    }
}
