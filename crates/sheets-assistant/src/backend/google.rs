//! Google Sheets Backend
//!
//! Sheets API v4 for spreadsheet content, Drive API v3 for listing, both
//! authorised with a bearer access token.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::SheetsBackend;
use crate::config::SheetsConfig;
use crate::error::{Result, SheetsError};
use crate::model::{Spreadsheet, SpreadsheetSummary, WorksheetInfo};

const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetResponse {
    spreadsheet_id: String,
    #[serde(default)]
    spreadsheet_url: Option<String>,
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    grid_properties: Option<GridProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: usize,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default)]
    web_view_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ── A1 notation ────────────────────────────────────────────────────

/// 1 → A, 26 → Z, 27 → AA
pub(crate) fn column_letter(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Quote a worksheet title for use in a range
pub(crate) fn quote_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn spreadsheet_url(id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{id}/edit")
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ── Backend ────────────────────────────────────────────────────────

/// Google Sheets REST backend
pub struct GoogleSheetsBackend {
    client: reqwest::Client,
    access_token: String,
    service_account: Option<String>,
    api_base_url: String,
    drive_base_url: String,
}

impl GoogleSheetsBackend {
    /// Create from configuration; fails without an access token
    pub fn from_config(config: &SheetsConfig) -> Result<Self> {
        let access_token = config
            .access_token
            .clone()
            .ok_or_else(|| SheetsError::Config("GOOGLE_ACCESS_TOKEN is not set".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            access_token,
            service_account: config.service_account_email.clone(),
            api_base_url: config.api_base_url.clone(),
            drive_base_url: config.drive_base_url.clone(),
        })
    }

    fn share_with(&self) -> String {
        self.service_account
            .clone()
            .unwrap_or_else(|| "the service account".into())
    }

    fn url(base: &str, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(base)
            .map_err(|e| SheetsError::Config(format!("invalid API base URL '{base}': {e}")))?;
        url.path_segments_mut()
            .map_err(|()| SheetsError::Config(format!("API base URL '{base}' cannot take a path")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn sheets_url(&self, segments: &[&str]) -> Result<reqwest::Url> {
        Self::url(&self.api_base_url, segments)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        spreadsheet_id: &str,
    ) -> Result<T> {
        let response = request.bearer_auth(&self.access_token).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        match status {
            200..=299 => Ok(serde_json::from_str(&body)?),
            404 => Err(SheetsError::SpreadsheetNotFound {
                id: spreadsheet_id.to_string(),
                share_with: self.share_with(),
            }),
            403 => Err(SheetsError::AccessDenied {
                share_with: self.share_with(),
            }),
            _ => {
                let message = serde_json::from_str::<ErrorEnvelope>(&body)
                    .map_or(body, |e| e.error.message);
                Err(SheetsError::Api { status, message })
            }
        }
    }
}

#[async_trait]
impl SheetsBackend for GoogleSheetsBackend {
    fn name(&self) -> &str {
        "google"
    }

    fn service_account(&self) -> Option<&str> {
        self.service_account.as_deref()
    }

    async fn list_spreadsheets(&self) -> Result<Vec<SpreadsheetSummary>> {
        let url = Self::url(&self.drive_base_url, &["drive", "v3", "files"])?;
        let query = format!("mimeType='{SPREADSHEET_MIME}' and trashed=false");
        let list: FileList = self
            .send(
                self.client.get(url).query(&[
                    ("q", query.as_str()),
                    ("fields", "files(id,name,webViewLink)"),
                    ("pageSize", "100"),
                ]),
                "",
            )
            .await?;

        Ok(list
            .files
            .into_iter()
            .map(|f| SpreadsheetSummary {
                url: f.web_view_link.unwrap_or_else(|| spreadsheet_url(&f.id)),
                id: f.id,
                title: f.name,
            })
            .collect())
    }

    async fn spreadsheet(&self, id: &str) -> Result<Spreadsheet> {
        let url = self.sheets_url(&["v4", "spreadsheets", id])?;
        let response: SpreadsheetResponse = self
            .send(
                self.client.get(url).query(&[(
                    "fields",
                    "spreadsheetId,spreadsheetUrl,properties.title,sheets.properties(sheetId,title,gridProperties.rowCount)",
                )]),
                id,
            )
            .await?;

        Ok(Spreadsheet {
            url: response
                .spreadsheet_url
                .unwrap_or_else(|| spreadsheet_url(&response.spreadsheet_id)),
            id: response.spreadsheet_id,
            title: response.properties.title,
            worksheets: response
                .sheets
                .into_iter()
                .map(|s| WorksheetInfo {
                    id: s.properties.sheet_id,
                    title: s.properties.title,
                    row_count: s.properties.grid_properties.map_or(0, |g| g.row_count),
                })
                .collect(),
        })
    }

    async fn values(&self, spreadsheet_id: &str, worksheet: &str) -> Result<Vec<Vec<String>>> {
        let range = quote_sheet(worksheet);
        let url = self.sheets_url(&["v4", "spreadsheets", spreadsheet_id, "values", &range])?;
        let values: ValueRange = self.send(self.client.get(url), spreadsheet_id).await?;

        Ok(values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn header_row(&self, spreadsheet_id: &str, worksheet: &str) -> Result<Vec<String>> {
        let range = format!("{}!1:1", quote_sheet(worksheet));
        let url = self.sheets_url(&["v4", "spreadsheets", spreadsheet_id, "values", &range])?;
        let values: ValueRange = self.send(self.client.get(url), spreadsheet_id).await?;

        Ok(values
            .values
            .into_iter()
            .next()
            .map(|row| row.into_iter().map(cell_text).collect())
            .unwrap_or_default())
    }

    async fn append_row(&self, spreadsheet_id: &str, worksheet: &str, row: &[String]) -> Result<()> {
        let segment = format!("{}:append", quote_sheet(worksheet));
        let url = self.sheets_url(&["v4", "spreadsheets", spreadsheet_id, "values", &segment])?;
        let _: Value = self
            .send(
                self.client
                    .post(url)
                    .query(&[("valueInputOption", "USER_ENTERED"), ("insertDataOption", "INSERT_ROWS")])
                    .json(&json!({ "majorDimension": "ROWS", "values": [row] })),
                spreadsheet_id,
            )
            .await?;
        Ok(())
    }

    async fn update_cell(
        &self,
        spreadsheet_id: &str,
        worksheet: &str,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<()> {
        let range = format!("{}!{}{row}", quote_sheet(worksheet), column_letter(column));
        let url = self.sheets_url(&["v4", "spreadsheets", spreadsheet_id, "values", &range])?;
        let _: Value = self
            .send(
                self.client
                    .put(url)
                    .query(&[("valueInputOption", "USER_ENTERED")])
                    .json(&json!({ "range": range, "majorDimension": "ROWS", "values": [[value]] })),
                spreadsheet_id,
            )
            .await?;
        Ok(())
    }

    async fn delete_row(&self, spreadsheet_id: &str, worksheet: &WorksheetInfo, row: usize) -> Result<()> {
        let segment = format!("{spreadsheet_id}:batchUpdate");
        let url = self.sheets_url(&["v4", "spreadsheets", &segment])?;
        let _: Value = self
            .send(
                self.client.post(url).json(&json!({
                    "requests": [{
                        "deleteDimension": {
                            "range": {
                                "sheetId": worksheet.id,
                                "dimension": "ROWS",
                                "startIndex": row.saturating_sub(1),
                                "endIndex": row
                            }
                        }
                    }]
                })),
                spreadsheet_id,
            )
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let Ok(url) = Self::url(&self.drive_base_url, &["drive", "v3", "about"]) else {
            return false;
        };
        match self
            .send::<Value>(self.client.get(url).query(&[("fields", "user")]), "")
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "Sheets health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(2), "B");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn test_sheet_titles_are_quoted() {
        assert_eq!(quote_sheet("Tasks"), "'Tasks'");
        assert_eq!(quote_sheet("Ann's tab"), "'Ann''s tab'");
    }

    #[test]
    fn test_requires_token() {
        let err = GoogleSheetsBackend::from_config(&SheetsConfig::default());
        assert!(matches!(err, Err(SheetsError::Config(_))));
    }
}
