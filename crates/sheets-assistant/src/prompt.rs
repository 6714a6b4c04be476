//! System Prompt
//!
//! Rebuilt every turn so the model always sees the current tabs and headers.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};

use agent_core::{PromptBuilder, UserContext};

use crate::model::SheetStructure;
use crate::workbook::Workbook;

/// Render the system prompt.
///
/// `structure` is `None` when no spreadsheet is active or it could not be read.
pub fn render_system_prompt(
    today: NaiveDate,
    service_email: Option<&str>,
    structure: Option<&SheetStructure>,
    user: &UserContext,
) -> String {
    let today = today.format("%Y-%m-%d");
    let mut prompt = format!(
        "You are a helpful assistant that can read and write to Google Sheets.\nToday's date is {today}.\n"
    );

    if let Some(email) = service_email.filter(|e| !e.is_empty()) {
        let _ = write!(prompt, "\nSERVICE ACCOUNT EMAIL (for sharing sheets): {email}\n");
    }

    match structure {
        Some(structure) => {
            let _ = write!(prompt, "\nACTIVE SHEET: \"{}\"\n", structure.title);
            for tab in &structure.tabs {
                let headers = serde_json::to_string(&tab.headers).unwrap_or_else(|_| "[]".into());
                let _ = write!(
                    prompt,
                    "\nTab \"{}\" (~{} rows):\n  Columns: {headers}",
                    tab.name, tab.row_count
                );
            }
            prompt.push('\n');
        }
        None => prompt.push_str(
            "\nNO SHEET ACTIVE. If the user shares a Google Sheets URL, use open_sheet to connect.\n\
             If open_sheet fails, tell them to share the sheet with the service account email above.\n",
        ),
    }

    let _ = write!(
        prompt,
        r#"
CRITICAL RULES:
1. You already know the sheet structure above. Use the EXACT column names when calling add_row or update_cell.
2. NEVER ask the user for details you can figure out yourself:
   - Numeric sequences (IDs, priorities): call read_sheet to see existing data, then assign the next number
   - Dates: use today's date ({today})
   - People/assignee columns: use the user's name or call read_sheet to see existing values
   - Status columns: use a sensible default like "New"
3. ALWAYS call the function immediately. Never just describe what you would do.

WORKFLOW FOR ADDING DATA:
1. You already know the column names from the structure above
2. Call read_sheet to see existing data patterns (next ID, existing people, etc.)
3. Build a data object using the exact header names as keys, filling ALL columns
4. Call add_row with the data. Do NOT ask the user to confirm or provide missing fields

WORKFLOW FOR UPDATING/DELETING DATA:
1. ALWAYS call search or read_sheet FIRST to find the exact row number. NEVER guess row numbers from memory
2. Row numbers in read_sheet and search results are 1-indexed (row 1 = first data row after the header)
3. Match on the value the user mentions to find the correct row
4. Then call update_cell or delete_row with the verified row number

WORKFLOW FOR OPENING A NEW SHEET:
1. User shares a URL: call open_sheet with the URL
2. If it fails (no access), tell the user to share the sheet with the service account email
3. Once open, the sheet structure will be available on the next message

FORMATTING: Reply in plain text. Use dashes (-) for lists. Do NOT use markdown or HTML.

Available functions: open_sheet, get_active_sheet, list_my_sheets, list_sheets, read_sheet, add_row, update_cell, delete_row, search"#
    );

    let _ = write!(prompt, "\n\nUser: {}", user.addressed_as());
    prompt
}

/// Prompt builder backed by the shared workbook
pub struct SheetPromptBuilder {
    workbook: Arc<Workbook>,
}

impl SheetPromptBuilder {
    pub fn new(workbook: Arc<Workbook>) -> Self {
        Self { workbook }
    }
}

#[async_trait]
impl PromptBuilder for SheetPromptBuilder {
    async fn system_prompt(&self, user: &UserContext) -> String {
        let structure = self.workbook.structure().await;
        render_system_prompt(
            Local::now().date_naive(),
            self.workbook.service_account(),
            structure.as_ref(),
            user,
        )
    }
}
