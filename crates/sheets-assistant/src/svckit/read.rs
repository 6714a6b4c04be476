//! Read and Search Tools

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use agent_core::{ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

use super::{sheet_name, sheet_name_param};
use crate::workbook::Workbook;

/// Reads every row of a worksheet
pub struct ReadSheetTool {
    workbook: Arc<Workbook>,
}

impl ReadSheetTool {
    pub fn new(workbook: Arc<Workbook>) -> Self {
        Self { workbook }
    }
}

#[async_trait]
impl Tool for ReadSheetTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "read_sheet".into(),
            description: "Read all data from a worksheet".into(),
            parameters: vec![sheet_name_param()],
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let data = self.workbook.read(sheet_name(call)).await?;
        Ok(ToolResult::from_value(json!({
            "headers": data.headers,
            "count": data.rows.len(),
            "rows": data.rows,
        })))
    }
}

/// Case-insensitive search across all worksheets
pub struct SearchTool {
    workbook: Arc<Workbook>,
}

impl SearchTool {
    pub fn new(workbook: Arc<Workbook>) -> Self {
        Self { workbook }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search".into(),
            description: "Search for text across all worksheets in the active sheet".into(),
            parameters: vec![ParameterSchema::new("query", "string", "Text to search for").required()],
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let query = call.require_text("query")?;
        let results = self.workbook.search(&query).await?;
        Ok(ToolResult::from_value(json!({
            "count": results.len(),
            "results": results,
        })))
    }
}
