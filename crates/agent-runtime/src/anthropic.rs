//! Anthropic Messages provider
//!
//! The system prompt goes in the top-level `system` field. Tool invocations
//! are `tool_use` blocks inside assistant turns and results are
//! `tool_result` blocks inside user turns.

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{ChatResponse, LlmProvider, first_tool_call, split_system},
    tool::{ToolCall, ToolSchema},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::http;

const VENDOR: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireMessage {
    pub role: &'static str,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Debug, Serialize)]
pub(crate) struct WireTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Response {
    #[serde(default)]
    pub content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

// ── Conversion ─────────────────────────────────────────────────────

/// Append blocks, merging into the previous turn when the role repeats
fn push_turn(turns: &mut Vec<WireMessage>, role: &'static str, blocks: Vec<ContentBlock>) {
    if blocks.is_empty() {
        return;
    }
    match turns.last_mut() {
        Some(last) if last.role == role => last.content.extend(blocks),
        _ => turns.push(WireMessage {
            role,
            content: blocks,
        }),
    }
}

fn text_blocks(text: &str) -> Vec<ContentBlock> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![ContentBlock::Text {
            text: text.to_string(),
        }]
    }
}

/// Encode the non-system history. Calls without a vendor id get `tool_<n>`.
pub(crate) fn convert_messages(messages: &[&Message]) -> Vec<WireMessage> {
    let mut turns = Vec::with_capacity(messages.len());
    let mut seq = 0usize;
    let mut pending_id: Option<String> = None;

    for msg in messages {
        match (msg.role, &msg.tool_call) {
            (Role::Assistant, Some(call)) => {
                seq += 1;
                let id = call.id.clone().unwrap_or_else(|| format!("tool_{seq}"));
                pending_id = Some(id.clone());
                let mut blocks = text_blocks(msg.text());
                blocks.push(ContentBlock::ToolUse {
                    id,
                    name: call.name.clone(),
                    input: call.arguments_value(),
                });
                push_turn(&mut turns, "assistant", blocks);
            }
            (Role::Tool, call) => {
                let id = pending_id
                    .take()
                    .or_else(|| call.as_ref().and_then(|c| c.id.clone()))
                    .unwrap_or_else(|| format!("tool_{}", seq.max(1)));
                push_turn(
                    &mut turns,
                    "user",
                    vec![ContentBlock::ToolResult {
                        tool_use_id: id,
                        content: msg.text().to_string(),
                    }],
                );
            }
            (Role::Assistant, None) => push_turn(&mut turns, "assistant", text_blocks(msg.text())),
            (Role::User | Role::System, _) => push_turn(&mut turns, "user", text_blocks(msg.text())),
        }
    }

    turns
}

pub(crate) fn convert_tools(tools: &[ToolSchema]) -> Vec<WireTool> {
    tools
        .iter()
        .map(|t| WireTool {
            name: t.name.clone(),
            description: t.description.clone(),
            input_schema: t.parameters_json(),
        })
        .collect()
}

pub(crate) fn convert_response(response: Response) -> Result<ChatResponse> {
    let mut text = String::new();
    let mut calls = Vec::new();

    for block in response.content {
        match block {
            ResponseBlock::Text { text: t } => text.push_str(&t),
            ResponseBlock::ToolUse { id, name, input } => {
                calls.push(ToolCall::from_value(name, input)?.with_id(id));
            }
            ResponseBlock::Other => {}
        }
    }

    Ok(ChatResponse {
        text,
        tool_call: first_tool_call(VENDOR, calls),
    })
}

// ── Provider ───────────────────────────────────────────────────────

/// Anthropic LLM provider
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";

    /// Create from configuration; fails without an API key
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = config.api_key().ok_or_else(|| {
            AgentError::Config("Anthropic requires an API key (LLM_API_KEY)".into())
        })?;

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

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        VENDOR
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<ChatResponse> {
        let (system, rest) = split_system(messages)?;
        let request = Request {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system,
            messages: convert_messages(&rest),
            tools: convert_tools(tools),
        };

        tracing::debug!(model = %self.model, turns = request.messages.len(), "Calling Anthropic");

        let response: Response = http::send_json(
            VENDOR,
            self.authorized(self.client.post(http::join(&self.base_url, "/v1/messages")))
                .json(&request),
        )
        .await?;

        convert_response(response)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(http::probe(
            VENDOR,
            self.authorized(self.client.get(http::join(&self.base_url, "/v1/models"))),
        )
        .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tool::ToolResult;
    use serde_json::{Map, json};

    #[test]
    fn test_requires_api_key() {
        let err = AnthropicProvider::from_config(&ProviderConfig::new("anthropic", "claude"));
        assert!(matches!(err, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_tool_exchange_uses_blocks() {
        let call = ToolCall::new("list_sheets", Map::new());
        let result = ToolResult::from_value(json!({ "sheets": ["Tasks"] }));
        let messages = [
            Message::user("what tabs?"),
            Message::assistant_tool_call("", call.clone()),
            Message::tool_result(&call, &result),
        ];
        let refs: Vec<&Message> = messages.iter().collect();
        let wire = serde_json::to_value(convert_messages(&refs)).unwrap();

        assert_eq!(wire[1]["role"], "assistant");
        assert_eq!(wire[1]["content"][0]["type"], "tool_use");
        assert_eq!(wire[1]["content"][0]["id"], "tool_1");
        assert_eq!(wire[1]["content"][0]["input"], json!({}));
        assert_eq!(wire[2]["role"], "user");
        assert_eq!(wire[2]["content"][0]["type"], "tool_result");
        assert_eq!(wire[2]["content"][0]["tool_use_id"], "tool_1");
        assert_eq!(wire[2]["content"][0]["content"], r#"{"sheets":["Tasks"]}"#);
    }

    #[test]
    fn test_narrative_precedes_tool_use() {
        let call = ToolCall::new("search", Map::new()).with_id("toolu_9");
        let messages = [Message::assistant_tool_call("Searching now", call)];
        let refs: Vec<&Message> = messages.iter().collect();
        let wire = serde_json::to_value(convert_messages(&refs)).unwrap();

        assert_eq!(wire[0]["content"][0], json!({ "type": "text", "text": "Searching now" }));
        assert_eq!(wire[0]["content"][1]["id"], "toolu_9");
    }

    #[test]
    fn test_consecutive_user_turns_merge() {
        let messages = [Message::user("a"), Message::user("b")];
        let refs: Vec<&Message> = messages.iter().collect();
        let wire = convert_messages(&refs);
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].content.len(), 2);
    }

    #[test]
    fn test_response_text_and_tool_use() {
        let response: Response = serde_json::from_value(json!({
            "id": "msg_1",
            "content": [
                { "type": "text", "text": "I'll add it." },
                { "type": "tool_use", "id": "toolu_1", "name": "add_row",
                  "input": { "data": { "Name": "Ann" } } },
                { "type": "thinking", "thinking": "..." }
            ],
            "stop_reason": "tool_use"
        }))
        .unwrap();

        let chat = convert_response(response).unwrap();
        assert_eq!(chat.text, "I'll add it.");
        let call = chat.tool_call.unwrap();
        assert_eq!(call.name, "add_row");
        assert_eq!(call.id.as_deref(), Some("toolu_1"));
        assert_eq!(call.arguments["data"], json!({ "Name": "Ann" }));
    }
}
