//! Provider configuration

use std::fmt;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default model when neither `LLM_MODEL` nor `OPENAI_MODEL` is set
pub const DEFAULT_MODEL: &str = "gpt-4-turbo";

/// Settings needed to construct one LLM provider
#[derive(Clone)]
pub struct ProviderConfig {
    /// Provider name, matched case-insensitively by the factory
    pub provider: String,

    /// API key; optional for Ollama
    pub api_key: Option<String>,

    /// Model identifier
    pub model: String,

    /// Override for the vendor endpoint
    pub base_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            api_key: None,
            model: DEFAULT_MODEL.into(),
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Load from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup.
    ///
    /// `LLM_API_KEY` and `LLM_MODEL` fall back to the legacy `OPENAI_API_KEY`
    /// and `OPENAI_MODEL`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout_secs = match get("LLM_TIMEOUT_SECS") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Invalid LLM_TIMEOUT_SECS, using default");
                DEFAULT_TIMEOUT_SECS
            }),
            None => DEFAULT_TIMEOUT_SECS,
        };

        Self {
            provider: get("LLM_PROVIDER").unwrap_or_else(|| "openai".into()),
            api_key: get("LLM_API_KEY").or_else(|| get("OPENAI_API_KEY")),
            model: get("LLM_MODEL")
                .or_else(|| get("OPENAI_MODEL"))
                .unwrap_or_else(|| DEFAULT_MODEL.into()),
            base_url: get("LLM_BASE_URL"),
            timeout_secs,
        }
    }

    /// The API key, if one is set and non-empty
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::from_lookup(lookup(&[]));
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-4-turbo");
        assert!(config.api_key().is_none());
        assert!(config.base_url.is_none());
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_legacy_fallbacks() {
        let config = ProviderConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-legacy"),
            ("OPENAI_MODEL", "gpt-4o"),
        ]));
        assert_eq!(config.api_key(), Some("sk-legacy"));
        assert_eq!(config.model, "gpt-4o");

        let config = ProviderConfig::from_lookup(lookup(&[
            ("LLM_API_KEY", "new"),
            ("OPENAI_API_KEY", "old"),
            ("LLM_PROVIDER", "Anthropic"),
            ("LLM_TIMEOUT_SECS", "nope"),
        ]));
        assert_eq!(config.api_key(), Some("new"));
        assert_eq!(config.provider, "Anthropic");
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ProviderConfig::new("openai", "gpt-4o").with_api_key("sk-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
