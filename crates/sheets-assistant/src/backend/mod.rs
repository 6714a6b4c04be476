//! Spreadsheet Backends
//!
//! Abstractions and implementations for spreadsheet storage.

mod google;
mod memory;

pub use google::GoogleSheetsBackend;
pub use memory::MemorySheets;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Spreadsheet, SpreadsheetSummary, WorksheetInfo};

/// Spreadsheet storage trait (Strategy pattern)
///
/// Row and column numbers are physical and 1-indexed: row 1 is the header.
#[async_trait]
pub trait SheetsBackend: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Identity spreadsheets must be shared with
    fn service_account(&self) -> Option<&str>;

    /// Spreadsheets shared with the service account
    async fn list_spreadsheets(&self) -> Result<Vec<SpreadsheetSummary>>;

    /// Metadata of one spreadsheet
    async fn spreadsheet(&self, id: &str) -> Result<Spreadsheet>;

    /// Every non-empty row of a worksheet, header first
    async fn values(&self, spreadsheet_id: &str, worksheet: &str) -> Result<Vec<Vec<String>>>;

    /// The header row of a worksheet
    async fn header_row(&self, spreadsheet_id: &str, worksheet: &str) -> Result<Vec<String>> {
        Ok(self
            .values(spreadsheet_id, worksheet)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    /// Append a row after the last data row
    async fn append_row(&self, spreadsheet_id: &str, worksheet: &str, row: &[String]) -> Result<()>;

    /// Overwrite one cell
    async fn update_cell(
        &self,
        spreadsheet_id: &str,
        worksheet: &str,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<()>;

    /// Remove one row, shifting the rows below it up
    async fn delete_row(&self, spreadsheet_id: &str, worksheet: &WorksheetInfo, row: usize) -> Result<()>;

    /// Check if the backend is usable
    async fn health_check(&self) -> bool {
        true
    }
}
