//! Service Kit - Agent Tools
//!
//! Spreadsheet tools that implement `agent_core::Tool`. Every tool shares one
//! `Workbook`, so opening a sheet affects all later calls.

mod catalog;
mod read;
mod write;

pub use catalog::{GetActiveSheetTool, ListMySheetsTool, ListSheetsTool, OpenSheetTool};
pub use read::{ReadSheetTool, SearchTool};
pub use write::{AddRowTool, DeleteRowTool, UpdateCellTool};

use agent_core::{ParameterSchema, ToolCall};

/// Optional `sheet_name` argument; blank means the first worksheet
pub(crate) fn sheet_name(call: &ToolCall) -> Option<&str> {
    call.str_arg("sheet_name").map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) fn sheet_name_param() -> ParameterSchema {
    ParameterSchema::new("sheet_name", "string", "Worksheet name. Omit for first sheet.")
}
