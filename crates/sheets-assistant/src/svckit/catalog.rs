//! Spreadsheet Catalog Tools
//!
//! Discover spreadsheets, switch the active one, and list its tabs.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use agent_core::{
    AgentError, ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
};

use crate::workbook::Workbook;

const DRIVE_HINT: &str = "Enable Google Drive API to list all sheets, or share a sheet URL directly";

/// Lists every spreadsheet shared with the service account
pub struct ListMySheetsTool {
    workbook: Arc<Workbook>,
}

impl ListMySheetsTool {
    pub fn new(workbook: Arc<Workbook>) -> Self {
        Self { workbook }
    }
}

#[async_trait]
impl Tool for ListMySheetsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_my_sheets".into(),
            description: "List all Google Sheets shared with the bot".into(),
            parameters: vec![],
            has_side_effects: false,
        }
    }

    async fn execute(&self, _call: &ToolCall) -> CoreResult<ToolResult> {
        match self.workbook.list_spreadsheets().await {
            Ok(sheets) => Ok(ToolResult::from_value(json!({ "sheets": sheets }))),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot list spreadsheets (Drive API may not be enabled)");
                Ok(ToolResult::error(DRIVE_HINT))
            }
        }
    }
}

/// Makes a spreadsheet active by URL or id
pub struct OpenSheetTool {
    workbook: Arc<Workbook>,
}

impl OpenSheetTool {
    pub fn new(workbook: Arc<Workbook>) -> Self {
        Self { workbook }
    }

    fn target(call: &ToolCall) -> Option<&str> {
        call.str_arg("url")
            .or_else(|| call.str_arg("name"))
            .filter(|s| !s.trim().is_empty())
    }
}

#[async_trait]
impl Tool for OpenSheetTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "open_sheet".into(),
            description: "Open a Google Sheet by URL or ID to work with it".into(),
            parameters: vec![ParameterSchema::new("url", "string", "Google Sheets URL or sheet ID").required()],
            has_side_effects: true,
        }
    }

    // Models occasionally send the id under `name`.
    fn validate(&self, call: &ToolCall) -> CoreResult<()> {
        Self::target(call)
            .map(|_| ())
            .ok_or_else(|| AgentError::ToolValidation("Missing required parameter: url".into()))
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let target = Self::target(call).unwrap_or_default();
        let sheet = self.workbook.open(target).await?;

        let mut info = sheet.to_json();
        info["service_account"] = self
            .workbook
            .service_account()
            .map_or(Value::Null, |email| json!(email));

        Ok(ToolResult::from_value(json!({ "success": true, "sheet": info })))
    }
}

/// Reports the active spreadsheet, or null
pub struct GetActiveSheetTool {
    workbook: Arc<Workbook>,
}

impl GetActiveSheetTool {
    pub fn new(workbook: Arc<Workbook>) -> Self {
        Self { workbook }
    }
}

#[async_trait]
impl Tool for GetActiveSheetTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_active_sheet".into(),
            description: "Get info about the currently active sheet".into(),
            parameters: vec![],
            has_side_effects: false,
        }
    }

    async fn execute(&self, _call: &ToolCall) -> CoreResult<ToolResult> {
        let active = self.workbook.active_info().await?;
        Ok(ToolResult::from_value(json!({
            "active_sheet": active.map_or(Value::Null, |s| s.to_json()),
        })))
    }
}

/// Lists the worksheets of the active spreadsheet
pub struct ListSheetsTool {
    workbook: Arc<Workbook>,
}

impl ListSheetsTool {
    pub fn new(workbook: Arc<Workbook>) -> Self {
        Self { workbook }
    }
}

#[async_trait]
impl Tool for ListSheetsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_sheets".into(),
            description: "List all worksheets/tabs in the active spreadsheet".into(),
            parameters: vec![],
            has_side_effects: false,
        }
    }

    async fn execute(&self, _call: &ToolCall) -> CoreResult<ToolResult> {
        let sheets: Vec<Value> = self
            .workbook
            .list_worksheets()
            .await?
            .into_iter()
            .map(|ws| json!({ "name": ws.title, "rows": ws.row_count }))
            .collect();
        Ok(ToolResult::from_value(json!({ "sheets": sheets })))
    }
}
