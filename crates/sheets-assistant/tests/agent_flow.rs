//! End-to-end turns: scripted model, real tools, in-memory spreadsheet.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use agent_core::{
    Agent, AgentConfig, ChatResponse, LlmProvider, Message, Result, RetryPolicy, ToolCall,
    ToolDispatcher, ToolResult, ToolSchema, UserContext,
};
use sheets_assistant::model::{Spreadsheet, SpreadsheetSummary, WorksheetInfo};
use sheets_assistant::{MemorySheets, SheetPromptBuilder, SheetsBackend, SheetsError, Workbook, register_tools};

#[derive(Default)]
struct ScriptedModel {
    script: Mutex<VecDeque<ChatResponse>>,
    prompts: Mutex<Vec<String>>,
    results: Mutex<Vec<ToolResult>>,
}

impl ScriptedModel {
    fn new(script: Vec<ChatResponse>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        })
    }

    fn next(&self) -> ChatResponse {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ChatResponse::text("out of script"))
    }
}

#[async_trait]
impl LlmProvider for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "test"
    }

    async fn chat(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<ChatResponse> {
        assert_eq!(tools.len(), 9);
        self.prompts.lock().unwrap().push(messages[0].text().to_string());
        Ok(self.next())
    }

    async fn chat_with_tool_result(
        &self,
        _messages: &[Message],
        _call: &ToolCall,
        result: &ToolResult,
        _tools: &[ToolSchema],
    ) -> Result<ChatResponse> {
        self.results.lock().unwrap().push(result.clone());
        Ok(self.next())
    }
}

fn tool_call(name: &str, args: Value) -> ChatResponse {
    ChatResponse::default().with_tool_call(ToolCall::from_value(name, args).unwrap())
}

fn agent(model: Arc<ScriptedModel>, backend: Arc<dyn SheetsBackend>) -> Agent {
    let workbook = Arc::new(Workbook::new(backend, Some("s1".into())).with_retry(RetryPolicy::none()));
    let mut tools = ToolDispatcher::new();
    register_tools(&mut tools, &workbook);

    Agent::new(
        model,
        Arc::new(tools),
        Arc::new(SheetPromptBuilder::new(workbook)),
        AgentConfig {
            retry: RetryPolicy::none(),
            ..Default::default()
        },
    )
}

fn tracker() -> Arc<MemorySheets> {
    Arc::new(
        MemorySheets::new()
            .with_service_account("bot@example.iam.gserviceaccount.com")
            .with_spreadsheet("s1", "Team Tasks")
            .with_worksheet(
                "s1",
                "Tasks",
                &[
                    &["Name", "Status", "Date"],
                    &["Ann", "New", "2026-01-02"],
                    &["Ben", "New", "2026-01-03"],
                    &["Cy", "New", "2026-01-04"],
                ],
            ),
    )
}

#[tokio::test]
async fn test_add_row_turn() {
    let sheets = tracker();
    let model = ScriptedModel::new(vec![
        tool_call("add_row", json!({ "data": { "Name": "Di", "Status": "New" } })),
        ChatResponse::text("Added Di."),
    ]);
    let agent = agent(model.clone(), sheets.clone());

    let user = UserContext::new("42").with_name("Ann", None);
    let reply = agent.process_message("add Di as a new task", &user).await.unwrap();

    assert_eq!(reply, "Added Di.");
    let results = model.results.lock().unwrap().clone();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].get("success"), Some(&json!(true)));
    assert_eq!(results[0].get("row_added"), Some(&json!(["Di", "New", ""])));
    assert_eq!(sheets.rows("s1", "Tasks").unwrap()[4], ["Di", "New", ""]);

    let prompt = model.prompts.lock().unwrap()[0].clone();
    assert!(prompt.contains("ACTIVE SHEET: \"Team Tasks\""));
    assert!(prompt.contains("Columns: [\"Name\",\"Status\",\"Date\"]"));
    assert!(prompt.ends_with("User: Ann"));

    let history = agent.history("42").await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].text(), "Added Di.");
}

#[tokio::test]
async fn test_search_then_update_turn() {
    let sheets = tracker();
    let model = ScriptedModel::new(vec![
        tool_call("search", json!({ "query": "cy" })),
        tool_call("update_cell", json!({ "row": 3, "column": "status", "value": "Done" })),
        ChatResponse::text("Marked Cy as done."),
    ]);
    let agent = agent(model.clone(), sheets.clone());

    let reply = agent
        .process_message("mark Cy as done", &UserContext::new("42"))
        .await
        .unwrap();

    assert_eq!(reply, "Marked Cy as done.");
    let results = model.results.lock().unwrap().clone();
    assert_eq!(results[0].get("results").unwrap()[0]["row"], 3);
    assert_eq!(results[1], ToolResult::success());

    let rows = sheets.rows("s1", "Tasks").unwrap();
    assert_eq!(rows[3], ["Cy", "Done", "2026-01-04"]);
    assert_eq!(rows[2][1], "New");
}

#[tokio::test]
async fn test_bad_row_reaches_model_as_error() {
    let model = ScriptedModel::new(vec![
        tool_call("delete_row", json!({ "row": 9 })),
        ChatResponse::text("That row does not exist."),
    ]);
    let agent = agent(model.clone(), tracker());

    let reply = agent
        .process_message("delete row 9", &UserContext::new("42"))
        .await
        .unwrap();

    assert_eq!(reply, "That row does not exist.");
    let results = model.results.lock().unwrap().clone();
    assert_eq!(
        results[0].error_message(),
        Some("Row 9 does not exist; the sheet has 3 data rows")
    );
}

/// Backend whose every request fails
struct UnreachableSheets;

fn outage() -> SheetsError {
    SheetsError::Api {
        status: 503,
        message: "backend unreachable".into(),
    }
}

#[async_trait]
impl SheetsBackend for UnreachableSheets {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn service_account(&self) -> Option<&str> {
        None
    }

    async fn list_spreadsheets(&self) -> sheets_assistant::Result<Vec<SpreadsheetSummary>> {
        Err(outage())
    }

    async fn spreadsheet(&self, _id: &str) -> sheets_assistant::Result<Spreadsheet> {
        Err(outage())
    }

    async fn values(&self, _id: &str, _worksheet: &str) -> sheets_assistant::Result<Vec<Vec<String>>> {
        Err(outage())
    }

    async fn append_row(&self, _id: &str, _worksheet: &str, _row: &[String]) -> sheets_assistant::Result<()> {
        Err(outage())
    }

    async fn update_cell(
        &self,
        _id: &str,
        _worksheet: &str,
        _row: usize,
        _column: usize,
        _value: &str,
    ) -> sheets_assistant::Result<()> {
        Err(outage())
    }

    async fn delete_row(&self, _id: &str, _worksheet: &WorksheetInfo, _row: usize) -> sheets_assistant::Result<()> {
        Err(outage())
    }
}

#[tokio::test]
async fn test_backend_outage_is_fed_back() {
    let model = ScriptedModel::new(vec![
        tool_call("read_sheet", json!({})),
        ChatResponse::text("The spreadsheet is unavailable right now."),
    ]);
    let agent = agent(model.clone(), Arc::new(UnreachableSheets));

    let reply = agent
        .process_message("show me the tasks", &UserContext::new("42"))
        .await
        .unwrap();

    assert_eq!(reply, "The spreadsheet is unavailable right now.");
    let results = model.results.lock().unwrap().clone();
    assert_eq!(
        results[0].to_value(),
        json!({ "error": "Google API error (HTTP 503): backend unreachable" })
    );

    let prompt = model.prompts.lock().unwrap()[0].clone();
    assert!(prompt.contains("NO SHEET ACTIVE"));
}

#[tokio::test]
async fn test_open_sheet_switches_structure_for_next_turn() {
    let sheets = Arc::new(
        MemorySheets::new()
            .with_spreadsheet("s1", "Team Tasks")
            .with_worksheet("s1", "Tasks", &[&["Name"]])
            .with_spreadsheet("s2", "Budget")
            .with_worksheet("s2", "Q1", &[&["Item", "Cost"]]),
    );
    let model = ScriptedModel::new(vec![
        tool_call(
            "open_sheet",
            json!({ "url": "https://docs.google.com/spreadsheets/d/s2/edit" }),
        ),
        ChatResponse::text("Opened Budget."),
        ChatResponse::text("It has one tab."),
    ]);
    let agent = agent(model.clone(), sheets);
    let user = UserContext::new("42");

    agent.process_message("open my budget", &user).await.unwrap();
    agent.process_message("what tabs?", &user).await.unwrap();

    let prompts = model.prompts.lock().unwrap().clone();
    assert!(prompts[0].contains("ACTIVE SHEET: \"Team Tasks\""));
    assert!(prompts[1].contains("ACTIVE SHEET: \"Budget\""));
    assert!(prompts[1].contains("Tab \"Q1\""));

    let results = model.results.lock().unwrap().clone();
    assert_eq!(results[0].get("success"), Some(&json!(true)));
}
