//! Provider Factory
//!
//! Resolves a provider name to an adapter. Only the requested adapter is
//! constructed, and a vendor whose cargo feature is disabled is reported as a
//! configuration error instead of failing at link time.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use agent_core::{AgentError, LlmProvider, Result};

use crate::config::ProviderConfig;

/// Supported LLM vendors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Google,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [Self; 4] = [Self::OpenAi, Self::Anthropic, Self::Google, Self::Ollama];

    /// Canonical name, also the cargo feature enabling the adapter
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Ollama => "ollama",
        }
    }

    /// Whether this vendor's adapter was compiled in
    pub const fn is_available(self) -> bool {
        match self {
            Self::OpenAi => cfg!(feature = "openai"),
            Self::Anthropic => cfg!(feature = "anthropic"),
            Self::Google => cfg!(feature = "google"),
            Self::Ollama => cfg!(feature = "ollama"),
        }
    }

    /// Whether this vendor refuses to work without an API key
    pub const fn requires_api_key(self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "google" | "gemini" => Ok(Self::Google),
            "ollama" => Ok(Self::Ollama),
            other => Err(AgentError::Config(format!(
                "Unsupported LLM provider: {other}. Use: {}",
                valid_names()
            ))),
        }
    }
}

fn valid_names() -> String {
    ProviderKind::ALL
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Vendors whose adapters are compiled into this build
pub fn available_providers() -> Vec<ProviderKind> {
    ProviderKind::ALL
        .into_iter()
        .filter(|k| k.is_available())
        .collect()
}

/// Construct the provider named in `config`
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    let kind: ProviderKind = config.provider.parse()?;

    let provider: Arc<dyn LlmProvider> = match kind {
        #[cfg(feature = "openai")]
        ProviderKind::OpenAi => Arc::new(crate::openai::OpenAiProvider::from_config(config)?),
        #[cfg(feature = "anthropic")]
        ProviderKind::Anthropic => Arc::new(crate::anthropic::AnthropicProvider::from_config(config)?),
        #[cfg(feature = "google")]
        ProviderKind::Google => Arc::new(crate::gemini::GeminiProvider::from_config(config)?),
        #[cfg(feature = "ollama")]
        ProviderKind::Ollama => Arc::new(crate::ollama::OllamaProvider::from_config(config)?),
        #[allow(unreachable_patterns)]
        other => {
            return Err(AgentError::Config(format!(
                "provider '{other}' is not available in this build; enable the `{}` feature",
                other.as_str()
            )));
        }
    };

    tracing::info!(provider = %kind, model = %config.model, "Using LLM provider");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_case_insensitive() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" ANTHROPIC ".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
        assert_eq!("ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
    }

    #[test]
    fn test_unknown_name_lists_valid_set() {
        let err = create_provider(&ProviderConfig::new("unsupported", "x")).err().unwrap();
        let AgentError::Config(message) = err else {
            panic!("expected a configuration error, got {err:?}");
        };
        assert!(message.contains("unsupported"));
        assert!(message.contains("openai, anthropic, google, ollama"));
    }

    #[test]
    fn test_missing_key_is_config_error() {
        for name in ["openai", "anthropic", "google"] {
            let result = create_provider(&ProviderConfig::new(name, "m"));
            assert!(matches!(result, Err(AgentError::Config(_))), "{name} accepted no key");
        }
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let provider = create_provider(&ProviderConfig::new("ollama", "llama3.1")).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "llama3.1");
    }

    #[test]
    fn test_default_build_has_every_vendor() {
        assert_eq!(available_providers(), ProviderKind::ALL.to_vec());
        assert!(ProviderKind::ALL.iter().filter(|k| k.requires_api_key()).count() == 3);
    }
}
