//! Google Gemini `generateContent` provider
//!
//! The system prompt travels as `systemInstruction`, the assistant role is
//! `model`, a tool invocation is a `functionCall` part and its result is a
//! `functionResponse` part in a following user turn.

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{ChatResponse, LlmProvider, first_tool_call, split_system},
    tool::{ToolCall, ToolSchema},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::ProviderConfig;
use crate::http;

const VENDOR: &str = "google";

/// Schema keywords the function-declaration format rejects
const UNSUPPORTED_SCHEMA_KEYS: [&str; 2] = ["additionalProperties", "$schema"];

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Request {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireTool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Response {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    pub content: Option<Content>,
}

// ── Conversion ─────────────────────────────────────────────────────

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

fn push_turn(contents: &mut Vec<Content>, role: &str, parts: Vec<Part>) {
    if parts.is_empty() {
        return;
    }
    match contents.last_mut() {
        Some(last) if last.role.as_deref() == Some(role) => last.parts.extend(parts),
        _ => contents.push(Content {
            role: Some(role.to_string()),
            parts,
        }),
    }
}

/// Tool results are sent as `{"result": <payload>}`
fn function_response(msg: &Message) -> Part {
    let name = msg
        .name
        .clone()
        .or_else(|| msg.tool_call.as_ref().map(|c| c.name.clone()))
        .unwrap_or_default();
    let payload = serde_json::from_str::<Value>(msg.text())
        .unwrap_or_else(|_| Value::String(msg.text().to_string()));

    Part {
        function_response: Some(FunctionResponse {
            name,
            response: json!({ "result": payload }),
        }),
        ..Default::default()
    }
}

/// Encode the non-system history
pub(crate) fn convert_messages(messages: &[&Message]) -> Vec<Content> {
    let mut contents = Vec::with_capacity(messages.len());

    for msg in messages {
        match (msg.role, &msg.tool_call) {
            (Role::Assistant, Some(call)) => {
                let mut parts = Vec::with_capacity(2);
                if !msg.text().is_empty() {
                    parts.push(Part::text(msg.text()));
                }
                parts.push(Part {
                    function_call: Some(FunctionCall {
                        name: call.name.clone(),
                        args: call.arguments_value(),
                    }),
                    ..Default::default()
                });
                push_turn(&mut contents, "model", parts);
            }
            (Role::Tool, _) => push_turn(&mut contents, "user", vec![function_response(msg)]),
            (Role::Assistant, None) if !msg.text().is_empty() => {
                push_turn(&mut contents, "model", vec![Part::text(msg.text())]);
            }
            (Role::User | Role::System, _) if !msg.text().is_empty() => {
                push_turn(&mut contents, "user", vec![Part::text(msg.text())]);
            }
            _ => {}
        }
    }

    contents
}

/// Drop the schema keywords the vendor rejects, at every depth
pub(crate) fn sanitize_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !UNSUPPORTED_SCHEMA_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), sanitize_schema(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_schema).collect()),
        other => other.clone(),
    }
}

pub(crate) fn convert_tools(tools: &[ToolSchema]) -> Vec<WireTool> {
    if tools.is_empty() {
        return Vec::new();
    }
    vec![WireTool {
        function_declarations: tools
            .iter()
            .map(|t| FunctionDeclaration {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: sanitize_schema(&t.parameters_json()),
            })
            .collect(),
    }]
}

pub(crate) fn convert_response(response: Response) -> Result<ChatResponse> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .map_or_else(|| "no candidates".to_string(), |f| f.to_string());
        return Err(AgentError::Provider(format!("google returned no answer: {reason}")));
    };

    let mut text = String::new();
    let mut calls = Vec::new();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(fc) = part.function_call {
            calls.push(ToolCall::from_value(fc.name, fc.args)?);
        }
    }

    Ok(ChatResponse {
        text,
        tool_call: first_tool_call(VENDOR, calls),
    })
}

// ── Provider ───────────────────────────────────────────────────────

/// Google Gemini LLM provider
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

    /// Create from configuration; fails without an API key
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key()
            .ok_or_else(|| AgentError::Config("Google requires an API key (LLM_API_KEY)".into()))?;

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

    fn model_url(&self, suffix: &str) -> String {
        http::join(&self.base_url, &format!("/v1beta/models/{}{suffix}", self.model))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        VENDOR
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<ChatResponse> {
        let (system, rest) = split_system(messages)?;
        let request = Request {
            contents: convert_messages(&rest),
            system_instruction: system.map(|s| Content {
                role: None,
                parts: vec![Part::text(s)],
            }),
            tools: convert_tools(tools),
        };

        tracing::debug!(model = %self.model, turns = request.contents.len(), "Calling Gemini");

        let response: Response = http::send_json(
            VENDOR,
            self.client
                .post(self.model_url(":generateContent"))
                .header("x-goog-api-key", &self.api_key)
                .json(&request),
        )
        .await?;

        convert_response(response)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(http::probe(
            VENDOR,
            self.client
                .get(self.model_url(""))
                .header("x-goog-api-key", &self.api_key),
        )
        .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tool::{ParameterSchema, ToolResult};
    use serde_json::Map;

    #[test]
    fn test_requires_api_key() {
        let err = GeminiProvider::from_config(&ProviderConfig::new("google", "gemini-1.5-pro"));
        assert!(matches!(err, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_schema_keywords_are_stripped() {
        let schema = ToolSchema {
            name: "add_row".into(),
            description: "Append a row".into(),
            parameters: vec![
                ParameterSchema::new("data", "object", "Column values")
                    .required()
                    .additional_properties(json!({ "type": "string" })),
            ],
            has_side_effects: true,
        };
        let wire = serde_json::to_value(convert_tools(&[schema])).unwrap();
        let decl = &wire[0]["functionDeclarations"][0];

        assert_eq!(decl["name"], "add_row");
        assert_eq!(decl["parameters"]["required"], json!(["data"]));
        assert_eq!(decl["parameters"]["properties"]["data"]["type"], "object");
        assert!(decl["parameters"]["properties"]["data"].get("additionalProperties").is_none());
    }

    #[test]
    fn test_tool_result_is_function_response_turn() {
        let call = ToolCall::new("read_sheet", Map::new());
        let result = ToolResult::from_value(json!({ "rows": 2 }));
        let messages = [
            Message::user("read"),
            Message::assistant_tool_call("", call.clone()),
            Message::tool_result(&call, &result),
        ];
        let refs: Vec<&Message> = messages.iter().collect();
        let wire = serde_json::to_value(convert_messages(&refs)).unwrap();

        assert_eq!(wire.as_array().unwrap().len(), 3);
        assert_eq!(wire[1]["role"], "model");
        assert_eq!(wire[1]["parts"][0]["functionCall"]["name"], "read_sheet");
        assert_eq!(wire[2]["role"], "user");
        assert_eq!(
            wire[2]["parts"][0]["functionResponse"],
            json!({ "name": "read_sheet", "response": { "result": { "rows": 2 } } })
        );
    }

    #[test]
    fn test_response_function_call() {
        let response: Response = serde_json::from_value(json!({
            "candidates": [{ "content": { "role": "model", "parts": [
                { "functionCall": { "name": "search", "args": { "query": "Ann" } } }
            ]}}]
        }))
        .unwrap();

        let chat = convert_response(response).unwrap();
        assert_eq!(chat.text, "");
        assert_eq!(chat.tool_call.unwrap().str_arg("query"), Some("Ann"));
    }

    #[test]
    fn test_blocked_prompt_is_provider_error() {
        let response: Response = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert!(matches!(convert_response(response), Err(AgentError::Provider(_))));
    }
}
