//! Anthropic Messages API backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::llm_client::backend::{
    Backend, BackendError, BackendResponse, CompletionRequest, Role, Usage,
};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
    input: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Talks to `POST {base_url}/v1/messages`.
#[derive(Clone)]
pub struct AnthropicBackend {
    client: Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
}

impl AnthropicBackend {
    pub fn new(client: Client, api_key: String, base_url: Option<String>, max_tokens: u32) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            max_tokens,
        }
    }
}

#[async_trait]
impl Backend for AnthropicBackend {
    fn provider(&self) -> &'static str {
        "anthropic"
    }

    async fn submit(
        &self,
        model: &str,
        request: &CompletionRequest,
    ) -> Result<BackendResponse, BackendError> {
        let body = build_request(model, self.max_tokens, request);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            // Try to parse the error message
            let message = serde_json::from_str::<AnthropicError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            warn!("Anthropic API returned {}: {}", status, message);
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        parse_response(&text)
    }
}

/// System-role messages are folded into the top-level `system` field;
/// the remaining turns keep their order.
fn build_request<'a>(
    model: &'a str,
    max_tokens: u32,
    request: &'a CompletionRequest,
) -> AnthropicRequest<'a> {
    let system: Vec<&str> = request
        .messages()
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let messages = request
        .messages()
        .iter()
        .filter_map(|m| match m.role {
            Role::System => None,
            Role::User => Some(AnthropicMessage {
                role: "user",
                content: &m.content,
            }),
            Role::Assistant => Some(AnthropicMessage {
                role: "assistant",
                content: &m.content,
            }),
        })
        .collect();

    let tools: Vec<AnthropicTool<'a>> = request
        .tools()
        .iter()
        .map(|t| AnthropicTool {
            name: &t.name,
            description: &t.description,
            input_schema: &t.parameters,
        })
        .collect();
    let tool_choice = (!tools.is_empty()).then(|| json!({ "type": "auto" }));

    AnthropicRequest {
        model,
        max_tokens,
        system: (!system.is_empty()).then(|| system.join("\n\n")),
        messages,
        tools,
        tool_choice,
    }
}

fn parse_response(body: &str) -> Result<BackendResponse, BackendError> {
    let parsed: AnthropicResponse = serde_json::from_str(body)
        .map_err(|e| BackendError::MalformedResponse(format!("anthropic: {e}")))?;

    let text: Vec<&str> = parsed
        .content
        .iter()
        .filter(|b| b.block_type == "text")
        .filter_map(|b| b.text.as_deref())
        .collect();

    let tool_call_arguments = parsed
        .content
        .iter()
        .find(|b| b.block_type == "tool_use")
        .and_then(|b| b.input.as_ref())
        .map(Value::to_string);

    Ok(BackendResponse {
        content: (!text.is_empty()).then(|| text.join("\n")),
        tool_call_arguments,
        finish_reason: parsed.stop_reason.unwrap_or_default(),
        usage: parsed.usage.map(|u| Usage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::backend::Message;
    use crate::llm_client::schema::{FieldType, Schema};

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            Schema::new("Brief").field("summary", FieldType::String),
            vec![
                Message::system("You are terse."),
                Message::system("Answer in JSON."),
                Message::user("Summarise Acme."),
            ],
        )
    }

    #[test]
    fn test_system_messages_are_folded() {
        let req = request();
        let body = serde_json::to_value(build_request("claude-x", 1024, &req)).unwrap();
        assert_eq!(body["system"], "You are terse.\n\nAnswer in JSON.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn test_output_tool_becomes_input_schema() {
        let req = request().with_output_tool();
        let body = serde_json::to_value(build_request("claude-x", 1024, &req)).unwrap();
        assert_eq!(body["tools"][0]["name"], "Brief");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(body["tool_choice"]["type"], "auto");
    }

    #[test]
    fn test_parse_tool_use_block() {
        let body = r#"{
            "content": [
                {"type": "text", "text": "Recording the brief."},
                {"type": "tool_use", "id": "tu_1", "name": "Brief", "input": {"summary": "Acme sells anvils"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 12, "output_tokens": 8}
        }"#;
        let parsed = parse_response(body).unwrap();
        assert_eq!(parsed.content.as_deref(), Some("Recording the brief."));
        let args: Value = serde_json::from_str(parsed.tool_call_arguments.as_deref().unwrap()).unwrap();
        assert_eq!(args["summary"], "Acme sells anvils");
        assert_eq!(parsed.finish_reason, "tool_use");
        assert_eq!(parsed.usage, Some(Usage { input_tokens: 12, output_tokens: 8 }));
    }

    #[test]
    fn test_parse_text_only_reply() {
        let body = r#"{"content": [{"type": "text", "text": "{\"summary\": \"ok\"}"}], "stop_reason": "end_turn"}"#;
        let parsed = parse_response(body).unwrap();
        assert!(parsed.tool_call_arguments.is_none());
        assert_eq!(parsed.content.as_deref(), Some("{\"summary\": \"ok\"}"));
        assert!(parsed.usage.is_none());
    }

    #[test]
    fn test_unexpected_body_is_malformed() {
        let err = parse_response("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, BackendError::MalformedResponse(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let backend = AnthropicBackend::new(
            Client::new(),
            "key".into(),
            Some("http://localhost:9999/".into()),
            1024,
        );
        assert_eq!(backend.base_url, "http://localhost:9999");
    }
}
