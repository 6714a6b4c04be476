//! HTTP Handlers

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

use agent_core::{AgentError, UserContext};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Accepts numeric ids as sent by chat platforms
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub message: String,
}

impl ChatRequest {
    fn user(&self) -> UserContext {
        UserContext {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "user_id must be a non-empty string or a number, got {other}"
        ))),
    }
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct HelpResponse {
    pub help: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: ProviderHealth,
    pub sheets: SheetsHealth,
}

#[derive(Serialize)]
pub struct ProviderHealth {
    pub name: String,
    pub model: String,
    pub healthy: bool,
}

#[derive(Serialize)]
pub struct SheetsHealth {
    pub backend: String,
    pub healthy: bool,
    pub active_spreadsheet: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn agent_status(err: &AgentError) -> StatusCode {
    match err {
        AgentError::ProviderUnavailable(_) | AgentError::RateLimited(_) | AgentError::Io(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn preview(text: &str) -> String {
    text.chars().take(100).collect()
}

/// Usage text shown by `/api/help`
pub fn help_text(service_email: &str) -> String {
    format!(
        r#"Sharing a sheet:
Share your Google Sheet with {service_email}
(Give "Editor" access for read+write)

Reading data:
- "Show me all data"
- "What's in the sheet?"
- "Search for John"

Adding data:
- "Add a row with Name: John, Email: john@example.com"
- "Add: Task: Fix bug, Status: Open"

Updating data:
- "Update row 3, set Status to Done"
- "Change row 5 Name to Jane"

Deleting data:
- "Delete row 4"

Working with multiple sheets:
- "What sheets do I have access to?"
- "Open https://docs.google.com/spreadsheets/d/..."
- "List all worksheets"

Tips:
- Row numbers start at 1 (after the header)
- Just describe what you want in plain English!"#
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider = state.agent.provider();
    let provider_healthy = provider.health_check().await.unwrap_or(false);
    let backend = state.workbook.backend();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: ProviderHealth {
            name: provider.name().to_string(),
            model: provider.model().to_string(),
            healthy: provider_healthy,
        },
        sheets: SheetsHealth {
            backend: backend.name().to_string(),
            healthy: backend.health_check().await,
            active_spreadsheet: state.workbook.active_title().await,
        },
    })
}

/// Usage instructions
pub async fn help(State(state): State<AppState>) -> Json<HelpResponse> {
    let email = state.workbook.service_account().unwrap_or("the service account");
    Json(HelpResponse {
        help: help_text(email),
    })
}

/// One user turn
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let user = payload.user();

    if !state.access.allows(&user) {
        tracing::warn!(user_id = %user.user_id, username = ?user.username, "Access denied");
        return Err(api_error(StatusCode::FORBIDDEN, "Access denied.", "ACCESS_DENIED"));
    }

    if payload.message.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Message must not be empty.",
            "EMPTY_MESSAGE",
        ));
    }

    tracing::info!(
        user_id = %user.user_id,
        username = ?user.username,
        message = %preview(&payload.message),
        "Received message"
    );

    let reply = state
        .agent
        .process_message(&payload.message, &user)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %user.user_id, error = %e, "Agent error");
            api_error(agent_status(&e), e.user_message(), "AGENT_ERROR")
        })?;

    tracing::info!(user_id = %user.user_id, "Sent reply");
    Ok(Json(ChatReply { reply }))
}
