//! Write Tools
//!
//! Append, update and delete rows. Row numbers are 1-indexed excluding the
//! header row, matching what `read_sheet` and `search` report.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use agent_core::{
    AgentError, ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
};

use super::{sheet_name, sheet_name_param};
use crate::workbook::Workbook;

/// Appends a row from a column-name mapping
pub struct AddRowTool {
    workbook: Arc<Workbook>,
}

impl AddRowTool {
    pub fn new(workbook: Arc<Workbook>) -> Self {
        Self { workbook }
    }

    /// `data`, else `row`, else every argument except `sheet_name`
    fn row_data(call: &ToolCall) -> CoreResult<Map<String, Value>> {
        let explicit = call
            .arguments
            .get("data")
            .or_else(|| call.arguments.get("row"))
            .filter(|v| !v.is_null());

        match explicit {
            Some(Value::Object(map)) => Ok(map.clone()),
            // Some models send the mapping JSON-encoded.
            Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(map)) => Ok(map),
                _ => Err(AgentError::ToolValidation(
                    "Parameter 'data' must be an object of column name to value".into(),
                )),
            },
            Some(_) => Err(AgentError::ToolValidation(
                "Parameter 'data' must be an object of column name to value".into(),
            )),
            None => Ok(call
                .arguments
                .iter()
                .filter(|(k, _)| k.as_str() != "sheet_name")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
        }
    }
}

#[async_trait]
impl Tool for AddRowTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "add_row".into(),
            description: "Add a new row to a worksheet".into(),
            parameters: vec![
                sheet_name_param(),
                ParameterSchema::new("data", "object", "Column name to value mapping")
                    .required()
                    .additional_properties(json!({ "type": "string" })),
            ],
            has_side_effects: true,
        }
    }

    fn validate(&self, call: &ToolCall) -> CoreResult<()> {
        if Self::row_data(call)?.is_empty() {
            return Err(AgentError::ToolValidation("Missing required parameter: data".into()));
        }
        Ok(())
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let data = Self::row_data(call)?;
        let added = self.workbook.add_row(&data, sheet_name(call)).await?;
        Ok(ToolResult::from_value(json!({
            "success": true,
            "row_added": added.row,
            "headers": added.headers,
        })))
    }
}

/// Overwrites a single cell
pub struct UpdateCellTool {
    workbook: Arc<Workbook>,
}

impl UpdateCellTool {
    pub fn new(workbook: Arc<Workbook>) -> Self {
        Self { workbook }
    }
}

#[async_trait]
impl Tool for UpdateCellTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "update_cell".into(),
            description: "Update a specific cell".into(),
            parameters: vec![
                sheet_name_param(),
                ParameterSchema::new("row", "integer", "Row number (1-indexed, excluding header)").required(),
                ParameterSchema::new("column", "string", "Column name").required(),
                ParameterSchema::new("value", "string", "New value").required(),
            ],
            has_side_effects: true,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let row = call.require_index("row")?;
        let column = call.require_text("column")?;
        let value = call.require_text("value")?;

        self.workbook
            .update_cell(row, &column, &value, sheet_name(call))
            .await?;
        Ok(ToolResult::success())
    }
}

/// Deletes a row, shifting later rows up
pub struct DeleteRowTool {
    workbook: Arc<Workbook>,
}

impl DeleteRowTool {
    pub fn new(workbook: Arc<Workbook>) -> Self {
        Self { workbook }
    }
}

#[async_trait]
impl Tool for DeleteRowTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "delete_row".into(),
            description: "Delete a row from a worksheet".into(),
            parameters: vec![
                sheet_name_param(),
                ParameterSchema::new("row", "integer", "Row number to delete (1-indexed, excluding header)")
                    .required(),
            ],
            has_side_effects: true,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let row = call.require_index("row")?;
        self.workbook.delete_row(row, sheet_name(call)).await?;
        Ok(ToolResult::success())
    }
}
