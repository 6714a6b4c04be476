//! Domain Models for Sheets Assistant

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One data row keyed by header
pub type Record = Map<String, Value>;

/// A spreadsheet visible to the service account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadsheetSummary {
    pub id: String,
    pub title: String,
    pub url: String,
}

/// A worksheet (tab) inside a spreadsheet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorksheetInfo {
    /// Numeric sheet id used by structural updates
    pub id: i64,
    pub title: String,
    /// Grid size, including the header row
    pub row_count: usize,
}

/// Spreadsheet metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spreadsheet {
    pub id: String,
    pub title: String,
    pub url: String,
    pub worksheets: Vec<WorksheetInfo>,
}

impl Spreadsheet {
    pub fn worksheet_titles(&self) -> Vec<String> {
        self.worksheets.iter().map(|w| w.title.clone()).collect()
    }

    /// Summary shape returned to the model
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "title": self.title,
            "url": self.url,
            "worksheets": self.worksheet_titles(),
        })
    }
}

/// Tab names and headers of the active spreadsheet, for the system prompt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetStructure {
    pub title: String,
    pub tabs: Vec<TabStructure>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TabStructure {
    pub name: String,
    pub headers: Vec<String>,
    /// Approximate number of data rows
    pub row_count: usize,
}

/// Contents of one worksheet
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
}

impl SheetData {
    /// Split raw values into headers and records; short rows are padded with ""
    pub fn from_values(values: Vec<Vec<String>>) -> Self {
        let mut iter = values.into_iter();
        let headers = iter.next().unwrap_or_default();
        let rows = iter
            .map(|row| {
                headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| (h.clone(), Value::String(row.get(i).cloned().unwrap_or_default())))
                    .collect()
            })
            .collect();
        Self { headers, rows }
    }
}

/// One search match; `row` is 1-indexed excluding the header
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchHit {
    pub sheet: String,
    pub row: usize,
    pub data: Record,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_are_padded() {
        let values = vec![
            vec!["Name".to_string(), "Status".to_string()],
            vec!["Ann".to_string()],
        ];
        let data = SheetData::from_values(values);
        assert_eq!(data.headers, ["Name", "Status"]);
        assert_eq!(data.rows[0]["Name"], "Ann");
        assert_eq!(data.rows[0]["Status"], "");
    }

    #[test]
    fn test_empty_sheet() {
        let data = SheetData::from_values(Vec::new());
        assert!(data.headers.is_empty());
        assert!(data.rows.is_empty());
    }
}
