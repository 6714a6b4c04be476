//! Conversation Messages
//!
//! Provider-neutral message format used across the agent system.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::tool::{ToolCall, ToolResult};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result (injected as context)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content (`None` for a pure tool invocation)
    pub content: Option<String>,

    /// Tool name, set on tool-result messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The tool call this message requests (assistant) or answers (tool)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
}

impl Message {
    /// Create a new text message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            name: None,
            tool_call: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant turn that requested `call`, with any narrative text it carried
    pub fn assistant_tool_call(text: &str, call: ToolCall) -> Self {
        Self {
            role: Role::Assistant,
            content: (!text.is_empty()).then(|| text.to_string()),
            name: None,
            tool_call: Some(call),
        }
    }

    /// Tool turn carrying the JSON-encoded outcome of `call`
    pub fn tool_result(call: &ToolCall, result: &ToolResult) -> Self {
        Self {
            role: Role::Tool,
            content: Some(result.to_json_string()),
            name: Some(call.name.clone()),
            tool_call: Some(call.clone()),
        }
    }

    /// The assistant-requested-call and tool-returned-result pair that
    /// follows a tool invocation in an outgoing request
    pub fn tool_exchange(call: &ToolCall, result: &ToolResult) -> [Self; 2] {
        [
            Self::assistant_tool_call("", call.clone()),
            Self::tool_result(call, result),
        ]
    }

    /// Text content, or the empty string
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// Bounded conversation history: at most `max_messages` entries, oldest evicted first.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    messages: VecDeque<Message>,
    max_messages: usize,
}

/// Default number of retained user/assistant messages
pub const DEFAULT_MAX_HISTORY: usize = 10;

impl Default for Conversation {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_HISTORY)
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_messages: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(max_messages + 1),
            max_messages,
        }
    }

    /// Append a message, evicting from the front until the cap holds
    pub fn push(&mut self, message: Message) {
        self.messages.push_back(message);
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }

    /// Snapshot of the retained messages, oldest first
    pub fn messages(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    /// Retained messages from the oldest user message on.
    ///
    /// Eviction can leave an assistant reply at the front, which some vendors
    /// reject as the opening turn of a request.
    pub fn window(&self) -> Vec<Message> {
        self.messages
            .iter()
            .skip_while(|m| m.role != Role::User)
            .cloned()
            .collect()
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    /// Drop all history
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
