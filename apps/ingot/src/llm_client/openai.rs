//! OpenAI-compatible chat-completions backend. Also covers Ollama and any
//! gateway exposing `/v1/chat/completions`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::llm_client::backend::{
    Backend, BackendError, BackendResponse, CompletionRequest, Message, Usage,
};

/// Local Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct ChatTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatFunction<'a>,
}

#[derive(Debug, Serialize)]
struct ChatFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    error: ChatErrorBody,
}

#[derive(Debug, Deserialize)]
struct ChatErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    max_tokens: u32,
}

impl OpenAiBackend {
    pub fn new(
        client: Client,
        api_key: Option<String>,
        base_url: Option<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            max_tokens,
        }
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    fn provider(&self) -> &'static str {
        "openai"
    }

    async fn submit(
        &self,
        model: &str,
        request: &CompletionRequest,
    ) -> Result<BackendResponse, BackendError> {
        let body = build_request(model, self.max_tokens, request);

        let mut call = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let response = call.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ChatError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            warn!("Chat completions endpoint returned {}: {}", status, message);
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        parse_response(&text)
    }
}

fn build_request<'a>(
    model: &'a str,
    max_tokens: u32,
    request: &'a CompletionRequest,
) -> ChatRequest<'a> {
    let tools: Vec<ChatTool<'a>> = request
        .tools()
        .iter()
        .map(|t| ChatTool {
            kind: "function",
            function: ChatFunction {
                name: &t.name,
                description: &t.description,
                parameters: &t.parameters,
            },
        })
        .collect();
    let tool_choice = (!tools.is_empty()).then_some("auto");

    ChatRequest {
        model,
        messages: request.messages(),
        max_tokens,
        tools,
        tool_choice,
    }
}

fn parse_response(body: &str) -> Result<BackendResponse, BackendError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| BackendError::MalformedResponse(format!("chat completions: {e}")))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::MalformedResponse("response has no choices".to_string()))?;

    Ok(BackendResponse {
        content: choice.message.content.filter(|c| !c.is_empty()),
        tool_call_arguments: choice
            .message
            .tool_calls
            .into_iter()
            .next()
            .map(|call| call.function.arguments),
        finish_reason: choice.finish_reason.unwrap_or_default(),
        usage: parsed.usage.map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        }),
    })
}
