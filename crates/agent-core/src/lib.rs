//! # agent-core
//!
//! Vendor-neutral tool-calling model, tool dispatch and the bounded agent loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Reasoning  │  │    Tool     │  │   LlmProvider       │  │
//! │  │    Loop     │──│  Dispatcher │──│   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! │         │                                                    │
//! │  ┌─────────────────────┐                                     │
//! │  │  ConversationStore  │  per-user history, one turn at a    │
//! │  └─────────────────────┘  time                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between OpenAI, Anthropic,
//! Gemini or Ollama without changing agent logic.

pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod retry;
pub mod session;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use provider::{ChatResponse, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, PromptBuilder, StaticPrompt, TurnOutcome};
pub use retry::{RetryPolicy, Retryable, with_retry};
pub use session::{ConversationStore, UserContext};
pub use tool::{Arguments, ParameterSchema, Tool, ToolCall, ToolDispatcher, ToolResult, ToolSchema};
