//! Chat-completions client abstraction.
//!
//! The [`LlmClient`] trait decouples the agent from the HTTP backend
//! (currently any OpenAI-compatible `/chat/completions` endpoint). Tests use
//! scripted clients that return predetermined responses without network I/O.

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

/// One message of the conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    /// Assistant turn that requested tool calls.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// A function tool the model may call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// Parameters for a single completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Tools offered for this turn; empty means a plain completion.
    pub tools: Vec<ToolDefinition>,
}

/// Model reply: final text, tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// Abstraction over chat-completion backends.
pub trait LlmClient {
    fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// Connection settings for [`OpenAiClient`].
#[derive(Clone)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: Option<f32>,
    pub timeout: Duration,
}

/// Blocking client for OpenAI-compatible chat completions.
pub struct OpenAiClient {
    client: Client,
    settings: OpenAiSettings,
}

impl OpenAiClient {
    pub fn new(settings: OpenAiSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("build http client")?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }
}

impl LlmClient for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.settings.model, messages = request.messages.len(), tools = request.tools.len()))]
    fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let body = WireRequest::new(&self.settings, request);
        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(api_key) = &self.settings.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = req.send().context("send chat completion request")?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), "chat completion failed");
            return Err(status_error(status, &text));
        }

        let wire: WireResponse = response.json().context("parse chat completion response")?;
        let parsed = wire.into_response()?;
        debug!(
            tool_calls = parsed.tool_calls.len(),
            has_content = parsed.content.is_some(),
            "chat completion received"
        );
        Ok(parsed)
    }
}

fn status_error(status: StatusCode, body: &str) -> anyhow::Error {
    match status {
        StatusCode::UNAUTHORIZED => {
            anyhow!("llm authentication failed (check OPENAI_API_KEY): {body}")
        }
        StatusCode::TOO_MANY_REQUESTS => anyhow!("llm rate limited: {body}"),
        _ => anyhow!("llm api error {}: {body}", status.as_u16()),
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

impl<'a> WireRequest<'a> {
    fn new(settings: &'a OpenAiSettings, request: &ChatRequest) -> Self {
        Self {
            model: &settings.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            temperature: settings.temperature,
            tools: request
                .tools
                .iter()
                .map(|tool| WireTool {
                    kind: "function",
                    function: WireFunction {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    },
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            tool_calls: message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: WireCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect(),
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

impl WireResponse {
    fn into_response(self) -> Result<ChatResponse> {
        let Some(choice) = self.choices.into_iter().next() else {
            bail!("chat completion response has no choices");
        };
        Ok(ChatResponse {
            content: choice.message.content,
            tool_calls: choice
                .message
                .tool_calls
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> OpenAiSettings {
        OpenAiSettings {
            base_url: "https://api.openai.com/v1/".to_string(),
            api_key: Some("sk-test".to_string()),
            model: "gpt-4o-mini".to_string(),
            temperature: None,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn parses_text_response() {
        let wire: WireResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "# Title\n\nBody." },
                "finish_reason": "stop"
            }]
        }))
        .expect("wire");
        let response = wire.into_response().expect("response");
        assert_eq!(response.content.as_deref(), Some("# Title\n\nBody."));
        assert!(response.tool_calls.is_empty());
    }

    #[test]
    fn parses_tool_call_response() {
        let wire: WireResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "search_the_internet_with_serper",
                            "arguments": "{\"search_query\":\"climate 2026\"}"
                        }
                    }]
                }
            }]
        }))
        .expect("wire");
        let response = wire.into_response().expect("response");
        assert_eq!(response.content, None);
        assert_eq!(
            response.tool_calls,
            vec![ToolCall {
                id: "call_1".to_string(),
                name: "search_the_internet_with_serper".to_string(),
                arguments: "{\"search_query\":\"climate 2026\"}".to_string(),
            }]
        );
    }

    #[test]
    fn empty_choices_is_error() {
        let wire: WireResponse = serde_json::from_value(json!({ "choices": [] })).expect("wire");
        let err = wire.into_response().unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn request_serializes_tool_turns() {
        let settings = settings();
        let request = ChatRequest {
            messages: vec![
                ChatMessage::system("sys"),
                ChatMessage::assistant_tool_calls(
                    None,
                    vec![ToolCall {
                        id: "call_1".to_string(),
                        name: "search".to_string(),
                        arguments: "{}".to_string(),
                    }],
                ),
                ChatMessage::tool_result("call_1", "results"),
            ],
            tools: Vec::new(),
        };
        let value = serde_json::to_value(WireRequest::new(&settings, &request)).expect("json");
        assert_eq!(value["model"], "gpt-4o-mini");
        assert!(value.get("tools").is_none());
        assert!(value.get("temperature").is_none());
        assert_eq!(value["messages"][1]["tool_calls"][0]["type"], "function");
        assert_eq!(value["messages"][1]["tool_calls"][0]["function"]["name"], "search");
        assert_eq!(value["messages"][2]["role"], "tool");
        assert_eq!(value["messages"][2]["tool_call_id"], "call_1");
    }

    #[test]
    fn endpoint_joins_base_url() {
        let client = OpenAiClient::new(settings()).expect("client");
        assert_eq!(
            client.endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn status_maps_to_readable_error() {
        let err = status_error(StatusCode::UNAUTHORIZED, "bad key");
        assert!(err.to_string().contains("OPENAI_API_KEY"));
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(err.to_string(), "llm rate limited: slow down");
        let err = status_error(StatusCode::BAD_GATEWAY, "upstream");
        assert!(err.to_string().contains("502"));
    }
}
