//! Server Settings

use agent_core::UserContext;
use agent_runtime::ProviderConfig;
use sheets_assistant::SheetsConfig;

/// Users allowed to talk to the agent; empty allows everyone
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessList {
    entries: Vec<String>,
}

impl AccessList {
    /// Parse a comma-separated list of user ids or usernames
    pub fn parse(raw: &str) -> Self {
        Self {
            entries: raw
                .split(',')
                .map(|e| e.trim().trim_start_matches('@'))
                .filter(|e| !e.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn allows(&self, user: &UserContext) -> bool {
        if self.is_open() {
            return true;
        }
        self.entries.iter().any(|entry| {
            *entry == user.user_id || user.username.as_deref().is_some_and(|name| name == entry)
        })
    }
}

/// Everything the binary reads from the environment
#[derive(Debug)]
pub struct Settings {
    pub provider: ProviderConfig,
    pub sheets: SheetsConfig,
    pub access: AccessList,
    pub bind_addr: String,
    pub log_level: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            provider: ProviderConfig::from_lookup(&lookup),
            sheets: SheetsConfig::from_lookup(&lookup),
            access: AccessList::parse(&get("ALLOWED_USERS").unwrap_or_default()),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            log_level: get("LOG_LEVEL").map_or_else(|| "info".into(), |l| l.to_lowercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_list() {
        let access = AccessList::parse(" 42, @annlee ,,");
        assert!(access.allows(&UserContext::new("42")));
        assert!(access.allows(&UserContext::new("7").with_username("annlee")));
        assert!(!access.allows(&UserContext::new("7").with_username("ben")));
    }

    #[test]
    fn test_empty_access_list_is_open() {
        let access = AccessList::parse("  ");
        assert!(access.is_open());
        assert!(access.allows(&UserContext::new("anyone")));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_lookup(|key| match key {
            "LOG_LEVEL" => Some("DEBUG".into()),
            "LLM_PROVIDER" => Some("ollama".into()),
            _ => None,
        });
        assert_eq!(settings.bind_addr, "0.0.0.0:3000");
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.provider.provider, "ollama");
        assert!(settings.access.is_open());
        assert!(!settings.sheets.has_credentials());
    }
}
