//! Shared HTTP plumbing for the vendor adapters.

use std::time::Duration;

use agent_core::error::{AgentError, Result};
use serde::de::DeserializeOwned;

/// Build a client with the configured request timeout
pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))
}

/// Join a base URL and an absolute path, tolerating a trailing slash on the base
pub(crate) fn join(base: &str, path: &str) -> String {
    format!("{}{path}", base.trim_end_matches('/'))
}

/// Send a request and decode a JSON body; non-2xx statuses are classified by code
pub(crate) async fn send_json<T: DeserializeOwned>(
    vendor: &str,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let response = request.send().await.map_err(|e| transport_error(vendor, &e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(vendor, &e))?;

    if !status.is_success() {
        tracing::debug!(vendor, status = status.as_u16(), body = %body, "Vendor request failed");
        return Err(AgentError::from_status(vendor, status.as_u16(), &body));
    }

    serde_json::from_str(&body)
        .map_err(|e| AgentError::Parse(format!("{vendor} response could not be decoded: {e}")))
}

/// Report whether a lightweight GET succeeds
pub(crate) async fn probe(vendor: &str, request: reqwest::RequestBuilder) -> bool {
    match request.send().await {
        Ok(response) if response.status().is_success() => true,
        Ok(response) => {
            tracing::warn!(vendor, status = response.status().as_u16(), "Health check failed");
            false
        }
        Err(e) => {
            tracing::warn!(vendor, error = %e, "Health check failed");
            false
        }
    }
}

fn transport_error(vendor: &str, err: &reqwest::Error) -> AgentError {
    if err.is_timeout() || err.is_connect() {
        AgentError::ProviderUnavailable(format!("{vendor} unreachable: {err}"))
    } else {
        AgentError::Provider(format!("{vendor} request failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_trims_slash() {
        assert_eq!(join("http://localhost:11434/", "/api/chat"), "http://localhost:11434/api/chat");
        assert_eq!(join("https://api.anthropic.com", "/v1/messages"), "https://api.anthropic.com/v1/messages");
    }
}
