//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for local Ollama inference over the
//! non-streaming `/api/chat` endpoint.

use agent_core::{
    error::Result,
    message::{Message, Role},
    provider::{ChatResponse, LlmProvider, first_tool_call},
    tool::ToolSchema,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::http;
use crate::tool_call_from_wire;

const VENDOR: &str = "ollama";

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireMessage {
    pub role: &'static str,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireToolCall {
    pub function: WireFunctionCall,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireFunctionCall {
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireTool {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: WireFunctionDef,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireFunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Response {
    pub message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseToolCall {
    pub function: ResponseFunctionCall,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseFunctionCall {
    pub name: String,
    /// An object, or a JSON-encoded string from some models
    #[serde(default)]
    pub arguments: Value,
}

// ── Conversion ─────────────────────────────────────────────────────

/// Convert agent messages to Ollama format
pub(crate) fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|m| match (m.role, &m.tool_call) {
            (Role::Assistant, Some(call)) => WireMessage {
                role: "assistant",
                content: m.text().to_string(),
                tool_calls: Some(vec![WireToolCall {
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments_value(),
                    },
                }]),
                tool_name: None,
            },
            (role, _) => WireMessage {
                role: match role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                },
                content: m.text().to_string(),
                tool_calls: None,
                tool_name: if role == Role::Tool { m.name.clone() } else { None },
            },
        })
        .collect()
}

pub(crate) fn convert_tools(tools: &[ToolSchema]) -> Vec<WireTool> {
    tools
        .iter()
        .map(|t| WireTool {
            tool_type: "function",
            function: WireFunctionDef {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters_json(),
            },
        })
        .collect()
}

pub(crate) fn convert_response(response: Response) -> Result<ChatResponse> {
    let Some(message) = response.message else {
        return Ok(ChatResponse::default());
    };

    let calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| tool_call_from_wire(tc.function.name, tc.function.arguments))
        .collect::<Result<Vec<_>>>()?;

    Ok(ChatResponse {
        text: message.content.unwrap_or_default(),
        tool_call: first_tool_call(VENDOR, calls),
    })
}

// ── Provider ───────────────────────────────────────────────────────

/// Ollama LLM provider
pub struct OllamaProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OllamaProvider {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:11434";

    /// Create from configuration. No API key is required.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.timeout_secs)?,
            api_key: config.api_key().map(str::to_string),
            model: config.model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_BASE_URL.into()),
        })
    }

    /// Create with default localhost settings
    pub fn localhost(model: impl Into<String>) -> Result<Self> {
        Self::from_config(&ProviderConfig::new(VENDOR, model))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        VENDOR
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<ChatResponse> {
        let request = Request {
            model: &self.model,
            messages: convert_messages(messages),
            stream: false,
            tools: convert_tools(tools),
        };

        let response: Response = http::send_json(
            VENDOR,
            self.authorized(self.client.post(http::join(&self.base_url, "/api/chat")))
                .json(&request),
        )
        .await?;

        convert_response(response)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(http::probe(
            VENDOR,
            self.authorized(self.client.get(http::join(&self.base_url, "/api/tags"))),
        )
        .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tool::{ToolCall, ToolResult};
    use serde_json::{Map, json};

    #[test]
    fn test_config_defaults() {
        let provider = OllamaProvider::localhost("llama3.1").unwrap();
        assert_eq!(provider.base_url, "http://localhost:11434");
        assert!(provider.api_key.is_none());
    }

    #[test]
    fn test_message_conversion() {
        let call = ToolCall::new("get_active_sheet", Map::new());
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("Hello"),
            Message::assistant_tool_call("", call.clone()),
            Message::tool_result(&call, &ToolResult::from_value(json!({ "title": "Budget" }))),
        ];

        let wire = serde_json::to_value(convert_messages(&messages)).unwrap();
        assert_eq!(wire.as_array().unwrap().len(), 4);
        assert_eq!(wire[2]["content"], "");
        assert_eq!(wire[2]["tool_calls"][0]["function"]["arguments"], json!({}));
        assert_eq!(wire[3]["role"], "tool");
        assert_eq!(wire[3]["tool_name"], "get_active_sheet");
        assert_eq!(wire[3]["content"], r#"{"title":"Budget"}"#);
    }

    #[test]
    fn test_string_arguments_are_decoded() {
        let response: Response = serde_json::from_value(json!({
            "model": "llama3.1",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    { "function": { "name": "delete_row", "arguments": "{\"row\": 2}" } }
                ]
            },
            "done": true
        }))
        .unwrap();

        let call = convert_response(response).unwrap().tool_call.unwrap();
        assert_eq!(call.name, "delete_row");
        assert_eq!(call.arguments["row"], json!(2));
    }
}
