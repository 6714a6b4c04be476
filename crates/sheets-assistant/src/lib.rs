//! # sheets-assistant
//!
//! Google Sheets collaborator for the agent: storage backends, the shared
//! active-spreadsheet state, nine spreadsheet tools and the system prompt.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  svckit tools ──┐                                         │
//! │                 ├──▶ Workbook ──▶ SheetsBackend           │
//! │  SheetPrompt ───┘    (active)      ├─ GoogleSheetsBackend │
//! │                                    └─ MemorySheets        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are addressed 1-indexed excluding the header everywhere the model
//! can see them.

pub mod backend;
pub mod config;
pub mod error;
pub mod model;
pub mod prompt;
pub mod svckit;
pub mod workbook;

use std::sync::Arc;

use agent_core::ToolDispatcher;

pub use backend::{GoogleSheetsBackend, MemorySheets, SheetsBackend};
pub use config::SheetsConfig;
pub use error::{Result, SheetsError};
pub use model::{SearchHit, SheetData, SheetStructure, Spreadsheet, SpreadsheetSummary, WorksheetInfo};
pub use prompt::{SheetPromptBuilder, render_system_prompt};
pub use workbook::{Workbook, extract_spreadsheet_id};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{
        AddRowTool, DeleteRowTool, GetActiveSheetTool, ListMySheetsTool, ListSheetsTool,
        OpenSheetTool, ReadSheetTool, SearchTool, UpdateCellTool,
    };
}

/// Register the nine spreadsheet tools, in catalog order
pub fn register_tools(dispatcher: &mut ToolDispatcher, workbook: &Arc<Workbook>) {
    use tools::{
        AddRowTool, DeleteRowTool, GetActiveSheetTool, ListMySheetsTool, ListSheetsTool,
        OpenSheetTool, ReadSheetTool, SearchTool, UpdateCellTool,
    };

    dispatcher.register(ListMySheetsTool::new(workbook.clone()));
    dispatcher.register(OpenSheetTool::new(workbook.clone()));
    dispatcher.register(GetActiveSheetTool::new(workbook.clone()));
    dispatcher.register(ListSheetsTool::new(workbook.clone()));
    dispatcher.register(ReadSheetTool::new(workbook.clone()));
    dispatcher.register(AddRowTool::new(workbook.clone()));
    dispatcher.register(UpdateCellTool::new(workbook.clone()));
    dispatcher.register(DeleteRowTool::new(workbook.clone()));
    dispatcher.register(SearchTool::new(workbook.clone()));
}
