//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider returned an error we cannot classify further
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Configuration error (unknown provider, missing credentials, disabled feature)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tool not found in dispatcher
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool argument validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Message list violates an adapter's input constraints
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Parse error (e.g., malformed tool-call arguments)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Classify a non-success HTTP status returned by a vendor API.
    pub fn from_status(vendor: &str, status: u16, body: &str) -> Self {
        let detail = format!("{vendor} returned HTTP {status}: {body}");
        match status {
            429 => AgentError::RateLimited(detail),
            500 | 502 | 503 | 504 => AgentError::ProviderUnavailable(detail),
            401 | 403 => AgentError::Auth(detail),
            _ => AgentError::Provider(detail),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::ProviderUnavailable(_) | AgentError::RateLimited(_) | AgentError::Io(_)
        )
    }

    /// The bare message for tool-level failures, without the variant prefix.
    ///
    /// This is what the model sees in an `{error}` payload.
    pub fn tool_message(&self) -> String {
        match self {
            AgentError::ToolNotFound(msg)
            | AgentError::ToolValidation(msg)
            | AgentError::ToolExecution(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Provider(_) | AgentError::Parse(_) | AgentError::InvalidRequest(_) => {
                "The AI service returned something I could not understand. Please try again.".into()
            }
            AgentError::ProviderUnavailable(_) | AgentError::Io(_) => {
                "I'm having trouble connecting to the AI service right now. Please try again in a moment.".into()
            }
            AgentError::RateLimited(_) => {
                "The AI service is busy. Please wait a moment and try again.".into()
            }
            AgentError::Auth(_) | AgentError::Config(_) => {
                "The assistant is not configured correctly. Please contact the administrator.".into()
            }
            _ => "Something unexpected went wrong. Please try again.".into(),
        }
    }
}
