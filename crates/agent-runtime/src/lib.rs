//! # agent-runtime
//!
//! LLM vendor adapters for the sheets-agent system.
//!
//! ## Providers
//!
//! - **OpenAI** (`openai` feature): Chat Completions with `tools`
//! - **Anthropic** (`anthropic` feature): Messages API with `tool_use` blocks
//! - **Google** (`google` feature): Gemini `generateContent` with function declarations
//! - **Ollama** (`ollama` feature): local inference via `/api/chat`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{ProviderConfig, create_provider};
//!
//! let provider = create_provider(&ProviderConfig::from_env())?;
//! let agent = AgentBuilder::new()
//!     .provider(provider)
//!     .build()?;
//! ```

pub mod config;
pub mod factory;
mod http;

#[cfg(feature = "anthropic")]
pub mod anthropic;
#[cfg(feature = "google")]
pub mod gemini;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "anthropic")]
pub use anthropic::AnthropicProvider;
#[cfg(feature = "google")]
pub use gemini::GeminiProvider;
#[cfg(feature = "ollama")]
pub use ollama::OllamaProvider;
#[cfg(feature = "openai")]
pub use openai::OpenAiProvider;

pub use config::ProviderConfig;
pub use factory::{ProviderKind, available_providers, create_provider};

// Re-export core types for convenience
pub use agent_core::{AgentError, ChatResponse, LlmProvider, Message, Result, Role, ToolCall};

/// Build a neutral call from wire arguments that may be an object or a JSON string
#[cfg(any(feature = "openai", feature = "ollama"))]
pub(crate) fn tool_call_from_wire(name: String, arguments: serde_json::Value) -> Result<ToolCall> {
    match arguments {
        serde_json::Value::String(raw) => ToolCall::from_json_str(name, &raw),
        other => ToolCall::from_value(name, other),
    }
}

#[cfg(all(test, any(feature = "openai", feature = "ollama")))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_arguments_as_object_or_string() {
        let from_object = tool_call_from_wire("search".into(), json!({ "query": "Ann" })).unwrap();
        let from_string = tool_call_from_wire("search".into(), json!(r#"{"query":"Ann"}"#)).unwrap();
        assert_eq!(from_object, from_string);
        assert!(tool_call_from_wire("search".into(), json!("not json")).is_err());
    }
}
