//! Reasoning Loop
//!
//! Drives one user turn: converse, invoke a tool, feed the result back,
//! converse again, until the model stops asking for tools or the loop cap
//! is reached.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::message::{DEFAULT_MAX_HISTORY, Message};
use crate::provider::LlmProvider;
use crate::retry::{RetryPolicy, with_retry};
use crate::session::{ConversationStore, UserContext};
use crate::tool::ToolDispatcher;

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum tool dispatches within one user turn
    pub max_tool_iterations: usize,

    /// Retained user/assistant messages per user
    pub max_history: usize,

    /// Reply used when the model's final text is empty
    pub fallback_reply: String,

    /// Backoff for each individual provider request
    pub retry: RetryPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: 5,
            max_history: DEFAULT_MAX_HISTORY,
            fallback_reply: "Done!".into(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Builds the system prompt at the start of every turn.
///
/// Implementations must not fail: anything they cannot fetch is left out.
#[async_trait]
pub trait PromptBuilder: Send + Sync {
    async fn system_prompt(&self, user: &UserContext) -> String;
}

/// Fixed prompt, for agents without external context
pub struct StaticPrompt(pub String);

#[async_trait]
impl PromptBuilder for StaticPrompt {
    async fn system_prompt(&self, _user: &UserContext) -> String {
        self.0.clone()
    }
}

/// What a completed turn produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Final reply, already substituted with the fallback when empty
    pub reply: String,

    /// Number of tool dispatches performed
    pub tool_calls: usize,

    /// True when the loop stopped at the cap while the model still wanted a tool
    pub exhausted: bool,
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolDispatcher>,
    prompt: Arc<dyn PromptBuilder>,
    conversations: ConversationStore,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolDispatcher>,
        prompt: Arc<dyn PromptBuilder>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            prompt,
            conversations: ConversationStore::new(config.max_history),
            config,
        }
    }

    /// Handle a user message and return the reply text
    pub async fn process_message(&self, text: &str, user: &UserContext) -> Result<String> {
        self.run_turn(text, user).await.map(|outcome| outcome.reply)
    }

    /// Handle a user message and report how the turn went.
    ///
    /// The user's history stays locked for the whole turn. On error the user
    /// message remains in history and no assistant entry is added.
    pub async fn run_turn(&self, text: &str, user: &UserContext) -> Result<TurnOutcome> {
        let mut history = self.conversations.acquire(&user.user_id).await;
        history.push(Message::user(text));

        let system = self.prompt.system_prompt(user).await;
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(system));
        messages.extend(history.window());

        let schemas = self.tools.schemas();
        let mut response = with_retry(&self.config.retry, "chat", || {
            self.provider.chat(&messages, &schemas)
        })
        .await?;

        let mut tool_calls = 0;
        while tool_calls < self.config.max_tool_iterations {
            let Some(call) = response.tool_call.take() else {
                break;
            };
            tool_calls += 1;

            tracing::info!(
                user = %user.user_id,
                iteration = tool_calls,
                tool = %call.name,
                arguments = %call.arguments_value(),
                side_effects = self.tools.has_side_effects(&call.name),
                "Tool call"
            );
            let result = self.tools.dispatch(&call).await;

            response = with_retry(&self.config.retry, "chat_with_tool_result", || {
                self.provider
                    .chat_with_tool_result(&messages, &call, &result, &schemas)
            })
            .await?;

            // Same encoding the follow-up request used, so later requests replay it verbatim
            messages.extend(Message::tool_exchange(&call, &result));
        }

        let exhausted = response.tool_call.is_some();
        if exhausted {
            tracing::warn!(
                user = %user.user_id,
                iterations = tool_calls,
                "Max tool iterations reached"
            );
        }

        let reply = if response.text.trim().is_empty() {
            self.config.fallback_reply.clone()
        } else {
            response.text
        };
        history.push(Message::assistant(reply.clone()));

        Ok(TurnOutcome {
            reply,
            tool_calls,
            exhausted,
        })
    }

    /// Snapshot of a user's retained history
    pub async fn history(&self, user_id: &str) -> Vec<Message> {
        self.conversations.history(user_id).await.messages()
    }

    /// Forget a user's history
    pub async fn reset(&self, user_id: &str) {
        self.conversations.reset(user_id).await;
    }

    /// Get the tool dispatcher
    pub fn tools(&self) -> &ToolDispatcher {
        &self.tools
    }

    /// Get the provider
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolDispatcher,
    prompt: Option<Arc<dyn PromptBuilder>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolDispatcher::new(),
            prompt: None,
            config: AgentConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn tools(mut self, tools: ToolDispatcher) -> Self {
        self.tools = tools;
        self
    }

    pub fn prompt(mut self, prompt: Arc<dyn PromptBuilder>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(Arc::new(StaticPrompt(prompt.into())));
        self
    }

    pub fn max_tool_iterations(mut self, max: usize) -> Self {
        self.config.max_tool_iterations = max;
        self
    }

    pub fn max_history(mut self, max: usize) -> Self {
        self.config.max_history = max;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| crate::AgentError::Config("Provider is required".into()))?;
        let prompt = self
            .prompt
            .unwrap_or_else(|| Arc::new(StaticPrompt("You are a helpful assistant.".into())));

        Ok(Agent::new(provider, Arc::new(self.tools), prompt, self.config))
    }
}
