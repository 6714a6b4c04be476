//! LLM Provider Strategy Pattern
//!
//! Defines the common tool-calling interface every vendor adapter implements,
//! so the agent loop works with any backend without code changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::LlmProvider;
//!
//! let response = provider.chat(&messages, &tools).await?;
//! if let Some(call) = response.tool_call {
//!     let result = dispatcher.dispatch(&call).await;
//!     let next = provider.chat_with_tool_result(&messages, &call, &result, &tools).await?;
//! }
//! ```

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::message::{Message, Role};
use crate::tool::{ToolCall, ToolResult, ToolSchema};

/// Normalized reply of one vendor exchange
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatResponse {
    /// Natural-language content; empty when the turn is purely a tool invocation
    pub text: String,

    /// Requested tool invocation, present iff the vendor signalled one
    pub tool_call: Option<ToolCall>,
}

impl ChatResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_call: None,
        }
    }

    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_call = Some(call);
        self
    }
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The agent works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "openai")
    fn name(&self) -> &str;

    /// Model identifier sent with every request
    fn model(&self) -> &str;

    /// Send the conversation and tool catalog, return text and at most one tool call
    async fn chat(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<ChatResponse>;

    /// Continue after a tool call: replays `messages`, then the vendor-specific
    /// "assistant requested `call`" and "tool returned `result`" turns.
    ///
    /// The extra turns exist only in the outgoing request.
    async fn chat_with_tool_result(
        &self,
        messages: &[Message],
        call: &ToolCall,
        result: &ToolResult,
        tools: &[ToolSchema],
    ) -> Result<ChatResponse> {
        let mut extended = Vec::with_capacity(messages.len() + 2);
        extended.extend_from_slice(messages);
        extended.extend(Message::tool_exchange(call, result));
        self.chat(&extended, tools).await
    }

    /// Check if the provider is reachable and configured correctly
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Split off the system prompt for vendors that take it out-of-band.
///
/// Fails if more than one system message is present.
pub fn split_system(messages: &[Message]) -> Result<(Option<&str>, Vec<&Message>)> {
    let mut system = None;
    let mut rest = Vec::with_capacity(messages.len());

    for msg in messages {
        if msg.role == Role::System {
            if system.is_some() {
                return Err(AgentError::InvalidRequest(
                    "at most one system message is allowed".into(),
                ));
            }
            system = Some(msg.text());
        } else {
            rest.push(msg);
        }
    }

    Ok((system, rest))
}

/// Keep only the first of the tool calls a vendor returned in one turn.
pub fn first_tool_call(provider: &str, calls: Vec<ToolCall>) -> Option<ToolCall> {
    if calls.len() > 1 {
        tracing::warn!(
            provider,
            dropped = calls.len() - 1,
            "Vendor returned several tool calls; keeping only the first"
        );
    }
    calls.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_split_system_extracts_prompt() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("Hi"),
            Message::assistant("Hello!"),
        ];

        let (system, rest) = split_system(&messages).unwrap();
        assert_eq!(system, Some("You are helpful."));
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].role, Role::User);
    }

    #[test]
    fn test_split_system_rejects_two_prompts() {
        let messages = vec![Message::system("a"), Message::system("b")];
        assert!(matches!(split_system(&messages), Err(AgentError::InvalidRequest(_))));
    }

    #[test]
    fn test_first_tool_call_truncates() {
        let calls = vec![
            ToolCall::new("read_sheet", Map::new()),
            ToolCall::new("search", Map::new()),
        ];
        let first = first_tool_call("test", calls).unwrap();
        assert_eq!(first.name, "read_sheet");
        assert!(first_tool_call("test", Vec::new()).is_none());
    }
}
