//! OpenAI Chat Completions provider
//!
//! Tool invocations travel as `tool_calls` on an assistant message; results
//! come back as `tool` role messages correlated by `tool_call_id`. The legacy
//! `function_call` field is still accepted in responses.

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{ChatResponse, LlmProvider, first_tool_call},
    tool::{ToolCall, ToolSchema},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::http;
use crate::tool_call_from_wire;

const VENDOR: &str = "openai";

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireMessage {
    pub role: &'static str,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: &'static str,
    pub function: WireFunctionCall,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireFunctionCall {
    pub name: String,
    /// JSON-encoded argument object
    pub arguments: String,
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
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ResponseToolCall>>,
    #[serde(default)]
    pub function_call: Option<ResponseFunctionCall>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseToolCall {
    pub id: Option<String>,
    pub function: ResponseFunctionCall,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

// ── Conversion ─────────────────────────────────────────────────────

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

/// Encode the neutral history. Calls without a vendor id get `call_<n>`,
/// and the following tool message answers the most recent call.
pub(crate) fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
    let mut converted = Vec::with_capacity(messages.len());
    let mut seq = 0usize;
    let mut pending_id: Option<String> = None;

    for msg in messages {
        let wire = match (msg.role, &msg.tool_call) {
            (Role::Assistant, Some(call)) => {
                seq += 1;
                let id = call.id.clone().unwrap_or_else(|| format!("call_{seq}"));
                pending_id = Some(id.clone());
                WireMessage {
                    role: "assistant",
                    content: msg.content.clone(),
                    tool_calls: Some(vec![WireToolCall {
                        id,
                        call_type: "function",
                        function: WireFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments_value().to_string(),
                        },
                    }]),
                    tool_call_id: None,
                }
            }
            (Role::Tool, call) => {
                let id = pending_id
                    .take()
                    .or_else(|| call.as_ref().and_then(|c| c.id.clone()))
                    .unwrap_or_else(|| format!("call_{seq}"));
                WireMessage {
                    role: "tool",
                    content: Some(msg.text().to_string()),
                    tool_calls: None,
                    tool_call_id: Some(id),
                }
            }
            (role, _) => WireMessage {
                role: role_name(role),
                content: Some(msg.text().to_string()),
                tool_calls: None,
                tool_call_id: None,
            },
        };
        converted.push(wire);
    }

    converted
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
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::Parse("openai response contained no choices".into()))?;
    let message = choice.message;

    let mut calls = Vec::new();
    for tc in message.tool_calls.unwrap_or_default() {
        let mut call = tool_call_from_wire(tc.function.name, tc.function.arguments)?;
        call.id = tc.id;
        calls.push(call);
    }
    if calls.is_empty() {
        if let Some(fc) = message.function_call {
            calls.push(tool_call_from_wire(fc.name, fc.arguments)?);
        }
    }

    Ok(ChatResponse {
        text: message.content.unwrap_or_default(),
        tool_call: first_tool_call(VENDOR, calls),
    })
}

// ── Provider ───────────────────────────────────────────────────────

/// OpenAI LLM provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";

    /// Create a provider; fails without an API key
    pub fn new(api_key: &str, model: &str, base_url: Option<&str>) -> Result<Self> {
        Self::from_config(
            &ProviderConfig {
                base_url: base_url.map(str::to_string),
                ..ProviderConfig::new(VENDOR, model)
            }
            .with_api_key(api_key),
        )
    }

    /// Create from configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key()
            .ok_or_else(|| AgentError::Config("OpenAI requires an API key (LLM_API_KEY)".into()))?;

        Ok(Self {
            client: http::build_client(config.timeout_secs)?,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_BASE_URL.into()),
        })
    }

    /// Accepts base URLs with or without the trailing `/v1`
    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}{path}")
        } else {
            format!("{base}/v1{path}")
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        VENDOR
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<ChatResponse> {
        let tools = convert_tools(tools);
        let request = Request {
            model: &self.model,
            messages: convert_messages(messages),
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools,
        };

        tracing::debug!(model = %self.model, messages = request.messages.len(), "Calling OpenAI");

        let response: Response = http::send_json(
            VENDOR,
            self.client
                .post(self.endpoint("/chat/completions"))
                .bearer_auth(&self.api_key)
                .json(&request),
        )
        .await?;

        convert_response(response)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(http::probe(
            VENDOR,
            self.client.get(self.endpoint("/models")).bearer_auth(&self.api_key),
        )
        .await)
    }
}
