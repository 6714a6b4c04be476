//! Workbook
//!
//! The active spreadsheet plus the operations the tools expose. Data rows are
//! addressed 1-indexed excluding the header, so data row `n` is physical
//! row `n + 1`. Columns are matched by header, case-insensitively.

use std::sync::Arc;

use agent_core::retry::{RetryPolicy, with_retry};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::backend::SheetsBackend;
use crate::error::{Result, SheetsError};
use crate::model::{
    SearchHit, SheetData, SheetStructure, Spreadsheet, SpreadsheetSummary, TabStructure, WorksheetInfo,
};

/// Result of a successful append
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppendedRow {
    pub row: Vec<String>,
    pub headers: Vec<String>,
}

/// Result of a successful cell update
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CellUpdate {
    /// Data row, 1-indexed excluding the header
    pub row: usize,
    /// Header as written in the sheet
    pub column: String,
    pub value: String,
}

/// Pull the spreadsheet id out of a Google Sheets URL; anything else is taken as an id
pub fn extract_spreadsheet_id(url_or_id: &str) -> &str {
    const MARKER: &str = "/spreadsheets/d/";

    let trimmed = url_or_id.trim();
    match trimmed.find(MARKER) {
        Some(pos) => {
            let rest = &trimmed[pos + MARKER.len()..];
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
                .unwrap_or(rest.len());
            &rest[..end]
        }
        None => trimmed,
    }
}

fn normalize(header: &str) -> String {
    header.trim().to_lowercase()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Order `data` by `headers`; keys match case-insensitively and missing columns become ""
pub fn map_to_headers(headers: &[String], data: &Map<String, Value>) -> Vec<String> {
    let lowered: Vec<(String, &Value)> = data.iter().map(|(k, v)| (normalize(k), v)).collect();
    headers
        .iter()
        .map(|h| {
            let key = normalize(h);
            lowered
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| cell_text(v))
                .unwrap_or_default()
        })
        .collect()
}

fn check_row(row: usize, data_rows: usize) -> Result<()> {
    if row == 0 {
        return Err(SheetsError::InvalidArgument(
            "Row numbers start at 1 (the first row after the header)".into(),
        ));
    }
    if row > data_rows {
        return Err(SheetsError::InvalidArgument(format!(
            "Row {row} does not exist; the sheet has {data_rows} data rows"
        )));
    }
    Ok(())
}

/// Shared spreadsheet state
pub struct Workbook {
    backend: Arc<dyn SheetsBackend>,
    default_spreadsheet_id: Option<String>,
    active: RwLock<Option<Spreadsheet>>,
    retry: RetryPolicy,
}

impl Workbook {
    pub fn new(backend: Arc<dyn SheetsBackend>, default_spreadsheet_id: Option<String>) -> Self {
        Self {
            backend,
            default_spreadsheet_id,
            active: RwLock::new(None),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn backend(&self) -> &Arc<dyn SheetsBackend> {
        &self.backend
    }

    pub fn service_account(&self) -> Option<&str> {
        self.backend.service_account()
    }

    /// Title of the active spreadsheet, without touching the backend
    pub async fn active_title(&self) -> Option<String> {
        self.active.read().await.as_ref().map(|s| s.title.clone())
    }

    async fn fetch(&self, id: &str) -> Result<Spreadsheet> {
        self.fetch_with(&self.retry, id).await
    }

    async fn fetch_with(&self, retry: &RetryPolicy, id: &str) -> Result<Spreadsheet> {
        with_retry(retry, "sheets.spreadsheet", || self.backend.spreadsheet(id)).await
    }

    async fn values(&self, spreadsheet_id: &str, worksheet: &str) -> Result<Vec<Vec<String>>> {
        with_retry(&self.retry, "sheets.values", || {
            self.backend.values(spreadsheet_id, worksheet)
        })
        .await
    }

    /// The active spreadsheet, connecting to the default one on first use
    pub async fn active(&self) -> Result<Spreadsheet> {
        self.active_with(&self.retry).await
    }

    async fn active_with(&self, retry: &RetryPolicy) -> Result<Spreadsheet> {
        if let Some(sheet) = self.active.read().await.clone() {
            return Ok(sheet);
        }

        let Some(id) = self.default_spreadsheet_id.as_deref() else {
            return Err(SheetsError::NotConnected);
        };
        let sheet = self.fetch_with(retry, id).await?;
        info!(title = %sheet.title, "Connected to default spreadsheet");
        *self.active.write().await = Some(sheet.clone());
        Ok(sheet)
    }

    /// Re-read the active spreadsheet's metadata
    pub async fn refresh(&self) -> Result<Spreadsheet> {
        let current = self.active().await?;
        let fresh = self.fetch(&current.id).await?;
        *self.active.write().await = Some(fresh.clone());
        Ok(fresh)
    }

    /// Make a spreadsheet active by URL or id
    pub async fn open(&self, url_or_id: &str) -> Result<Spreadsheet> {
        let id = extract_spreadsheet_id(url_or_id);
        if id.is_empty() {
            return Err(SheetsError::InvalidArgument("A spreadsheet URL or id is required".into()));
        }

        let sheet = self.fetch(id).await?;
        info!(title = %sheet.title, id = %sheet.id, "Connected to spreadsheet");
        *self.active.write().await = Some(sheet.clone());
        Ok(sheet)
    }

    /// The active spreadsheet if one was selected; never connects
    pub async fn active_info(&self) -> Result<Option<Spreadsheet>> {
        if self.active.read().await.is_none() {
            return Ok(None);
        }
        self.refresh().await.map(Some)
    }

    pub async fn list_spreadsheets(&self) -> Result<Vec<SpreadsheetSummary>> {
        with_retry(&self.retry, "sheets.list_spreadsheets", || {
            self.backend.list_spreadsheets()
        })
        .await
    }

    pub async fn list_worksheets(&self) -> Result<Vec<WorksheetInfo>> {
        Ok(self.refresh().await?.worksheets)
    }

    /// Resolve a worksheet by exact title, or the first one when `name` is `None`
    async fn worksheet(&self, name: Option<&str>) -> Result<(Spreadsheet, WorksheetInfo)> {
        let find = |sheet: &Spreadsheet| match name {
            Some(name) => sheet.worksheets.iter().find(|w| w.title == name).cloned(),
            None => sheet.worksheets.first().cloned(),
        };

        let mut sheet = self.active().await?;
        if find(&sheet).is_none() {
            // The tab may have been created since the metadata was cached.
            sheet = self.refresh().await?;
        }

        match find(&sheet) {
            Some(ws) => Ok((sheet, ws)),
            None => Err(SheetsError::WorksheetNotFound {
                name: name.unwrap_or("first worksheet").to_string(),
                available: sheet.worksheet_titles(),
            }),
        }
    }

    /// Tab names and headers of the active spreadsheet; `None` if unavailable.
    ///
    /// Makes a single attempt per request so an outage never delays a turn.
    pub async fn structure(&self) -> Option<SheetStructure> {
        let sheet = match self.active_with(&RetryPolicy::none()).await {
            Ok(sheet) => sheet,
            Err(e) => {
                debug!(error = %e, "No spreadsheet structure available");
                return None;
            }
        };

        let mut tabs = Vec::with_capacity(sheet.worksheets.len());
        for ws in &sheet.worksheets {
            match self.backend.header_row(&sheet.id, &ws.title).await {
                Ok(headers) if !headers.is_empty() => tabs.push(TabStructure {
                    name: ws.title.clone(),
                    headers,
                    row_count: ws.row_count.saturating_sub(1),
                }),
                Ok(_) => {}
                Err(e) => debug!(tab = %ws.title, error = %e, "Could not read headers"),
            }
        }

        Some(SheetStructure {
            title: sheet.title,
            tabs,
        })
    }

    /// Headers and records of a worksheet
    pub async fn read(&self, sheet_name: Option<&str>) -> Result<SheetData> {
        let (sheet, ws) = self.worksheet(sheet_name).await?;
        Ok(SheetData::from_values(self.values(&sheet.id, &ws.title).await?))
    }

    /// Append a row built from a column-name mapping
    pub async fn add_row(&self, data: &Map<String, Value>, sheet_name: Option<&str>) -> Result<AppendedRow> {
        let (sheet, ws) = self.worksheet(sheet_name).await?;
        let headers = with_retry(&self.retry, "sheets.header_row", || {
            self.backend.header_row(&sheet.id, &ws.title)
        })
        .await?;

        let row = map_to_headers(&headers, data);
        if row.iter().all(String::is_empty) {
            tracing::warn!(
                headers = ?headers,
                keys = ?data.keys().collect::<Vec<_>>(),
                "Could not map data to headers"
            );
            return Err(SheetsError::UnmappedData { headers });
        }

        self.backend.append_row(&sheet.id, &ws.title, &row).await?;
        info!(worksheet = %ws.title, row = ?row, "Added row");

        Ok(AppendedRow { row, headers })
    }

    /// Overwrite one cell of data row `row`
    pub async fn update_cell(
        &self,
        row: usize,
        column: &str,
        value: &str,
        sheet_name: Option<&str>,
    ) -> Result<CellUpdate> {
        let (sheet, ws) = self.worksheet(sheet_name).await?;
        let values = self.values(&sheet.id, &ws.title).await?;
        let headers = values.first().cloned().unwrap_or_default();

        let wanted = normalize(column);
        let index = headers
            .iter()
            .position(|h| normalize(h) == wanted)
            .ok_or_else(|| SheetsError::ColumnNotFound {
                column: column.to_string(),
                available: headers.clone(),
            })?;
        check_row(row, values.len().saturating_sub(1))?;

        with_retry(&self.retry, "sheets.update_cell", || {
            self.backend
                .update_cell(&sheet.id, &ws.title, row + 1, index + 1, value)
        })
        .await?;
        info!(worksheet = %ws.title, row, column = %headers[index], value, "Updated cell");

        Ok(CellUpdate {
            row,
            column: headers[index].clone(),
            value: value.to_string(),
        })
    }

    /// Delete data row `row`
    pub async fn delete_row(&self, row: usize, sheet_name: Option<&str>) -> Result<()> {
        let (sheet, ws) = self.worksheet(sheet_name).await?;
        let values = self.values(&sheet.id, &ws.title).await?;
        check_row(row, values.len().saturating_sub(1))?;

        self.backend.delete_row(&sheet.id, &ws, row + 1).await?;
        info!(worksheet = %ws.title, row, "Deleted row");
        Ok(())
    }

    /// Case-insensitive substring search over every worksheet
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(SheetsError::InvalidArgument("Search query must not be empty".into()));
        }

        let sheet = self.active().await?;
        let mut hits = Vec::new();
        for ws in &sheet.worksheets {
            let values = match self.values(&sheet.id, &ws.title).await {
                Ok(values) => values,
                Err(e) => {
                    debug!(tab = %ws.title, error = %e, "Skipping worksheet during search");
                    continue;
                }
            };

            let data = SheetData::from_values(values);
            for (idx, record) in data.rows.into_iter().enumerate() {
                if record.values().any(|v| cell_text(v).to_lowercase().contains(&needle)) {
                    hits.push(SearchHit {
                        sheet: ws.title.clone(),
                        row: idx + 1,
                        data: record,
                    });
                }
            }
        }
        Ok(hits)
    }
}
