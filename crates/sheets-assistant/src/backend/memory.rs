//! In-memory Spreadsheet Backend
//!
//! For testing and demo purposes.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use super::SheetsBackend;
use crate::error::{Result, SheetsError};
use crate::model::{Spreadsheet, SpreadsheetSummary, WorksheetInfo};

struct MemoryTab {
    id: i64,
    title: String,
    rows: Vec<Vec<String>>,
}

struct MemoryBook {
    id: String,
    title: String,
    tabs: Vec<MemoryTab>,
}

impl MemoryBook {
    fn url(&self) -> String {
        format!("memory://spreadsheets/d/{}", self.id)
    }

    fn tab_mut(&mut self, worksheet: &str) -> Result<&mut MemoryTab> {
        let available = self.tabs.iter().map(|t| t.title.clone()).collect();
        self.tabs
            .iter_mut()
            .find(|t| t.title == worksheet)
            .ok_or_else(|| SheetsError::WorksheetNotFound {
                name: worksheet.to_string(),
                available,
            })
    }
}

/// Spreadsheets held in process memory
#[derive(Default)]
pub struct MemorySheets {
    service_account: Option<String>,
    books: RwLock<Vec<MemoryBook>>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service_account(mut self, email: impl Into<String>) -> Self {
        self.service_account = Some(email.into());
        self
    }

    /// Add an empty spreadsheet
    pub fn with_spreadsheet(self, id: impl Into<String>, title: impl Into<String>) -> Self {
        self.books
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MemoryBook {
                id: id.into(),
                title: title.into(),
                tabs: Vec::new(),
            });
        self
    }

    /// Add a worksheet to a spreadsheet added earlier; `rows[0]` is the header
    pub fn with_worksheet(self, spreadsheet_id: &str, title: impl Into<String>, rows: &[&[&str]]) -> Self {
        {
            let mut books = self.books.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(book) = books.iter_mut().find(|b| b.id == spreadsheet_id) {
                let id = i64::try_from(book.tabs.len()).unwrap_or_default();
                book.tabs.push(MemoryTab {
                    id,
                    title: title.into(),
                    rows: rows
                        .iter()
                        .map(|r| r.iter().map(|c| (*c).to_string()).collect())
                        .collect(),
                });
            }
        }
        self
    }

    /// Sample task tracker used when no Google credentials are configured
    pub fn demo() -> Self {
        Self::new()
            .with_service_account("demo@sheets-agent.local")
            .with_spreadsheet("demo", "Demo Tracker")
            .with_worksheet(
                "demo",
                "Tasks",
                &[
                    &["ID", "Task", "Status", "Owner", "Date"],
                    &["1", "Write onboarding doc", "Done", "Ann", "2026-01-05"],
                    &["2", "Review budget", "In Progress", "Ben", "2026-01-12"],
                ],
            )
            .with_worksheet("demo", "Contacts", &[&["Name", "Email"]])
    }

    /// Snapshot of a worksheet's rows, header included
    pub fn rows(&self, spreadsheet_id: &str, worksheet: &str) -> Option<Vec<Vec<String>>> {
        let books = self.books.read().unwrap_or_else(PoisonError::into_inner);
        books
            .iter()
            .find(|b| b.id == spreadsheet_id)?
            .tabs
            .iter()
            .find(|t| t.title == worksheet)
            .map(|t| t.rows.clone())
    }

    fn with_book<T>(&self, id: &str, f: impl FnOnce(&mut MemoryBook) -> Result<T>) -> Result<T> {
        let mut books = self.books.write().unwrap_or_else(PoisonError::into_inner);
        let book = books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| SheetsError::SpreadsheetNotFound {
                id: id.to_string(),
                share_with: self.service_account.clone().unwrap_or_else(|| "the service account".into()),
            })?;
        f(book)
    }
}

#[async_trait]
impl SheetsBackend for MemorySheets {
    fn name(&self) -> &str {
        "memory"
    }

    fn service_account(&self) -> Option<&str> {
        self.service_account.as_deref()
    }

    async fn list_spreadsheets(&self) -> Result<Vec<SpreadsheetSummary>> {
        let books = self.books.read().unwrap_or_else(PoisonError::into_inner);
        Ok(books
            .iter()
            .map(|b| SpreadsheetSummary {
                id: b.id.clone(),
                title: b.title.clone(),
                url: b.url(),
            })
            .collect())
    }

    async fn spreadsheet(&self, id: &str) -> Result<Spreadsheet> {
        self.with_book(id, |book| {
            Ok(Spreadsheet {
                id: book.id.clone(),
                title: book.title.clone(),
                url: book.url(),
                worksheets: book
                    .tabs
                    .iter()
                    .map(|t| WorksheetInfo {
                        id: t.id,
                        title: t.title.clone(),
                        row_count: t.rows.len(),
                    })
                    .collect(),
            })
        })
    }

    async fn values(&self, spreadsheet_id: &str, worksheet: &str) -> Result<Vec<Vec<String>>> {
        self.with_book(spreadsheet_id, |book| Ok(book.tab_mut(worksheet)?.rows.clone()))
    }

    async fn append_row(&self, spreadsheet_id: &str, worksheet: &str, row: &[String]) -> Result<()> {
        self.with_book(spreadsheet_id, |book| {
            book.tab_mut(worksheet)?.rows.push(row.to_vec());
            Ok(())
        })
    }

    async fn update_cell(
        &self,
        spreadsheet_id: &str,
        worksheet: &str,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<()> {
        self.with_book(spreadsheet_id, |book| {
            let tab = book.tab_mut(worksheet)?;
            if row == 0 || column == 0 {
                return Err(SheetsError::InvalidArgument("cell coordinates are 1-indexed".into()));
            }
            if tab.rows.len() < row {
                tab.rows.resize(row, Vec::new());
            }
            let cells = &mut tab.rows[row - 1];
            if cells.len() < column {
                cells.resize(column, String::new());
            }
            cells[column - 1] = value.to_string();
            Ok(())
        })
    }

    async fn delete_row(&self, spreadsheet_id: &str, worksheet: &WorksheetInfo, row: usize) -> Result<()> {
        self.with_book(spreadsheet_id, |book| {
            let tab = book.tab_mut(&worksheet.title)?;
            if row == 0 || row > tab.rows.len() {
                return Err(SheetsError::InvalidArgument(format!("Row {row} does not exist")));
            }
            tab.rows.remove(row - 1);
            Ok(())
        })
    }
}
