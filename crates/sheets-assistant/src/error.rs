//! Error Types for Sheets Assistant

use agent_core::{AgentError, Retryable};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SheetsError>;

#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("No spreadsheet is open. Share a Google Sheets URL to get started.")]
    NotConnected,

    #[error("Sheet not found. Share it with: {share_with}")]
    SpreadsheetNotFound { id: String, share_with: String },

    #[error("No access. Share the sheet with: {share_with}")]
    AccessDenied { share_with: String },

    #[error("Worksheet '{name}' not found. Available: {available:?}")]
    WorksheetNotFound { name: String, available: Vec<String> },

    #[error("Column '{column}' not found. Available: {available:?}")]
    ColumnNotFound { column: String, available: Vec<String> },

    #[error("Could not map data. Sheet headers are: {headers:?}")]
    UnmappedData { headers: Vec<String> },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Google API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Retryable for SheetsError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

impl From<SheetsError> for AgentError {
    fn from(err: SheetsError) -> Self {
        AgentError::ToolExecution(err.to_string())
    }
}
