//! Spreadsheet configuration

use std::fmt;

pub const DEFAULT_SHEETS_API_URL: &str = "https://sheets.googleapis.com";
pub const DEFAULT_DRIVE_API_URL: &str = "https://www.googleapis.com";

/// Settings for the Google Sheets backend
#[derive(Clone)]
pub struct SheetsConfig {
    /// Spreadsheet opened when none has been selected yet
    pub default_spreadsheet_id: Option<String>,

    /// OAuth bearer token with spreadsheets and drive scopes
    pub access_token: Option<String>,

    /// Identity users must share their sheets with
    pub service_account_email: Option<String>,

    pub api_base_url: String,

    pub drive_base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            default_spreadsheet_id: None,
            access_token: None,
            service_account_email: None,
            api_base_url: DEFAULT_SHEETS_API_URL.into(),
            drive_base_url: DEFAULT_DRIVE_API_URL.into(),
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for SheetsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetsConfig")
            .field("default_spreadsheet_id", &self.default_spreadsheet_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("service_account_email", &self.service_account_email)
            .field("api_base_url", &self.api_base_url)
            .field("drive_base_url", &self.drive_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SheetsConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            default_spreadsheet_id: get("GOOGLE_SHEET_ID"),
            access_token: get("GOOGLE_ACCESS_TOKEN"),
            service_account_email: get("GOOGLE_SERVICE_ACCOUNT_EMAIL"),
            api_base_url: get("GOOGLE_SHEETS_API_URL").unwrap_or(defaults.api_base_url),
            drive_base_url: get("GOOGLE_DRIVE_API_URL").unwrap_or(defaults.drive_base_url),
            timeout_secs: defaults.timeout_secs,
        }
    }

    /// Whether the Google backend can be constructed
    pub fn has_credentials(&self) -> bool {
        self.access_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lookup() {
        let config = SheetsConfig::from_lookup(|key| match key {
            "GOOGLE_SHEET_ID" => Some("abc123".into()),
            "GOOGLE_ACCESS_TOKEN" => Some("  ".into()),
            _ => None,
        });
        assert_eq!(config.default_spreadsheet_id.as_deref(), Some("abc123"));
        assert!(!config.has_credentials());
        assert_eq!(config.api_base_url, DEFAULT_SHEETS_API_URL);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = SheetsConfig {
            access_token: Some("ya29.secret".into()),
            ..Default::default()
        };
        assert!(!format!("{config:?}").contains("ya29"));
    }
}
