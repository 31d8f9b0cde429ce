//! Backend seam: request/response envelopes and the trait every text-generation
//! provider implements. The client only relies on response text, optional
//! native tool-call arguments and a finish indicator.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::llm_client::schema::{Schema, StructuredOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

}

/// A callable-tool descriptor offered to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool arguments.
    pub parameters: Value,
}

impl ToolSpec {
    /// Advertises `schema` as a tool so tool-calling backends return the
    /// result as structured arguments instead of free text.
    pub fn for_schema(schema: &Schema) -> Self {
        Self {
            name: schema.name().to_string(),
            description: format!("Return the result as a structured {} record.", schema.name()),
            parameters: schema.json_schema(),
        }
    }
}

/// One completion call. Built once, never mutated after construction.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    messages: Vec<Message>,
    schema: Schema,
    tools: Vec<ToolSpec>,
    use_fallback: bool,
}

impl CompletionRequest {
    pub fn new(schema: Schema, messages: Vec<Message>) -> Self {
        Self {
            messages,
            schema,
            tools: Vec::new(),
            use_fallback: true,
        }
    }

    /// Request whose target schema is that of `T`.
    pub fn for_output<T: StructuredOutput>(messages: Vec<Message>) -> Self {
        Self::new(T::schema(), messages)
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Adds the target schema itself as a tool.
    pub fn with_output_tool(self) -> Self {
        let tool = ToolSpec::for_schema(&self.schema);
        self.with_tools(vec![tool])
    }

    /// Disables the tag-based fallback path of the extraction cascade.
    pub fn without_fallback(mut self) -> Self {
        self.use_fallback = false;
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    pub fn use_fallback(&self) -> bool {
        self.use_fallback
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Provider-neutral view of a raw backend reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendResponse {
    pub content: Option<String>,
    /// Raw JSON arguments of the first native tool call, if any.
    pub tool_call_arguments: Option<String>,
    pub finish_reason: String,
    pub usage: Option<Usage>,
}

impl BackendResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: "stop".to_string(),
            ..Self::default()
        }
    }

    pub fn tool_call(arguments: impl Into<String>) -> Self {
        Self {
            tool_call_arguments: Some(arguments.into()),
            finish_reason: "tool_calls".to_string(),
            ..Self::default()
        }
    }
}

/// The backend could not produce a reply. Always retried by the client.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error")]
    Transport(#[from] reqwest::Error),

    #[error("backend call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("backend failed after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<BackendError>,
    },
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Short provider label used in logs.
    fn provider(&self) -> &'static str;

    async fn submit(
        &self,
        model: &str,
        request: &CompletionRequest,
    ) -> Result<BackendResponse, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::schema::FieldType;

    fn schema() -> Schema {
        Schema::new("Verdict").field("approved", FieldType::Boolean)
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(Message::system("be terse")).unwrap();
        assert_eq!(json["role"], "system");
    }

    #[test]
    fn test_output_tool_uses_schema_name_and_json_schema() {
        let request = CompletionRequest::new(schema(), vec![Message::user("ok?")]).with_output_tool();
        assert_eq!(request.tools().len(), 1);
        assert_eq!(request.tools()[0].name, "Verdict");
        assert_eq!(request.tools()[0].parameters["required"][0], "approved");
    }

    #[test]
    fn test_fallback_is_enabled_by_default() {
        let request = CompletionRequest::new(schema(), vec![]);
        assert!(request.use_fallback());
        assert!(!request.without_fallback().use_fallback());
    }

    #[test]
    fn test_retries_exhausted_exposes_last_error() {
        let err = BackendError::RetriesExhausted {
            attempts: 3,
            last: Box::new(BackendError::Api {
                status: 503,
                message: "overloaded".into(),
            }),
        };
        assert_eq!(err.to_string(), "backend failed after 3 attempts");
        assert_eq!(
            format!("{:#}", anyhow::Error::from(err)),
            "backend failed after 3 attempts: API error (status 503): overloaded"
        );
    }
}
