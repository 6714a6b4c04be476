use agent_core::tool::{ParameterSchema, ToolCall, ToolResult, ToolSchema};
use agent_core::{AgentError, LlmProvider, Message};
use agent_runtime::{ProviderConfig, create_provider};
use serde_json::{Map, Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(provider: &str, server: &MockServer) -> ProviderConfig {
    ProviderConfig::new(provider, "test-model")
        .with_api_key("test-key")
        .with_base_url(server.uri())
}

fn catalog() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: "update_cell".into(),
            description: "Update one cell".into(),
            parameters: vec![
                ParameterSchema::new("row", "integer", "Row number").required(),
                ParameterSchema::new("column", "string", "Column name").required(),
                ParameterSchema::new("value", "string", "New value").required(),
                ParameterSchema::new("sheet_name", "string", "Tab name"),
            ],
            has_side_effects: true,
        },
        ToolSchema {
            name: "list_sheets".into(),
            description: "List tabs".into(),
            parameters: vec![],
            has_side_effects: false,
        },
    ]
}

fn conversation() -> Vec<Message> {
    vec![
        Message::system("You manage spreadsheets."),
        Message::user("Mark row 3 as done"),
    ]
}

fn update_call() -> ToolCall {
    let mut args = Map::new();
    args.insert("row".into(), json!(3));
    args.insert("column".into(), json!("status"));
    args.insert("value".into(), json!("Done"));
    ToolCall::new("update_cell", args)
}

async fn received_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    serde_json::from_slice(&requests.last().unwrap().body).unwrap()
}

fn names(list: &Value, key: &str) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|t| t.pointer(key).unwrap().as_str().unwrap().to_string())
        .collect()
}

// ── OpenAI ─────────────────────────────────────────────────────────

#[tokio::test]
async fn openai_tool_call_then_result() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_77", "type": "function",
                    "function": { "name": "update_cell",
                                  "arguments": "{\"row\":3,\"column\":\"status\",\"value\":\"Done\"}" }
                }]
            }}]
        })))
        .mount(&server)
        .await;

    let provider = create_provider(&config("openai", &server)).unwrap();
    let messages = conversation();
    let first = provider.chat(&messages, &catalog()).await.unwrap();

    let call = first.tool_call.unwrap();
    assert_eq!(call.name, "update_cell");
    assert_eq!(call.id.as_deref(), Some("call_77"));

    let body = received_body(&server).await;
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["tool_choice"], "auto");
    assert_eq!(names(&body["tools"], "/function/name"), ["update_cell", "list_sheets"]);
    assert_eq!(body["tools"][0]["function"]["description"], "Update one cell");
    assert_eq!(
        body["tools"][0]["function"]["parameters"]["required"],
        json!(["row", "column", "value"])
    );

    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Row 3 is done." } }]
        })))
        .mount(&server)
        .await;

    let result = ToolResult::from_value(json!({ "success": true }));
    let second = provider
        .chat_with_tool_result(&messages, &call, &result, &catalog())
        .await
        .unwrap();
    assert_eq!(second.text, "Row 3 is done.");
    assert!(second.tool_call.is_none());

    let body = received_body(&server).await;
    let sent = body["messages"].as_array().unwrap();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[0]["content"], "You manage spreadsheets.");
    assert_eq!(sent[1]["content"], "Mark row 3 as done");
    assert_eq!(sent[2]["tool_calls"][0]["id"], "call_77");
    assert_eq!(sent[3]["role"], "tool");
    assert_eq!(sent[3]["tool_call_id"], "call_77");
    assert_eq!(sent[3]["content"], r#"{"success":true}"#);
}

#[tokio::test]
async fn openai_status_codes_are_classified() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let provider = create_provider(&config("openai", &server)).unwrap();
    let err = provider.chat(&conversation(), &[]).await.unwrap_err();
    assert!(matches!(err, AgentError::RateLimited(_)));
    assert!(err.is_retryable());

    server.reset().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let err = provider.chat(&conversation(), &[]).await.unwrap_err();
    assert!(matches!(err, AgentError::Auth(_)));
    assert!(!err.is_retryable());
}

// ── Anthropic ──────────────────────────────────────────────────────

#[tokio::test]
async fn anthropic_system_and_tool_blocks() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "Updated." }],
            "stop_reason": "end_turn"
        })))
        .mount(&server)
        .await;

    let provider = create_provider(&config("Anthropic", &server)).unwrap();
    let messages = conversation();
    let reply = provider
        .chat_with_tool_result(&messages, &update_call(), &ToolResult::success(), &catalog())
        .await
        .unwrap();
    assert_eq!(reply.text, "Updated.");

    let body = received_body(&server).await;
    assert_eq!(body["system"], "You manage spreadsheets.");
    assert_eq!(body["max_tokens"], 4096);
    assert_eq!(names(&body["tools"], "/name"), ["update_cell", "list_sheets"]);
    assert_eq!(
        body["tools"][0]["input_schema"]["required"],
        json!(["row", "column", "value"])
    );

    let sent = body["messages"].as_array().unwrap();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0]["content"][0]["text"], "Mark row 3 as done");
    assert_eq!(sent[1]["content"][0]["type"], "tool_use");
    assert_eq!(sent[1]["content"][0]["id"], "tool_1");
    assert_eq!(sent[2]["content"][0]["tool_use_id"], "tool_1");
}

#[tokio::test]
async fn anthropic_overload_is_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let provider = create_provider(&config("anthropic", &server)).unwrap();
    let err = provider.chat(&conversation(), &[]).await.unwrap_err();
    assert!(matches!(err, AgentError::ProviderUnavailable(_)));
}

// ── Gemini ─────────────────────────────────────────────────────────

#[tokio::test]
async fn gemini_single_follow_up_exchange() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/test-model:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "systemInstruction": { "parts": [{ "text": "You manage spreadsheets." }] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "Done." }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = create_provider(&config("google", &server)).unwrap();
    let reply = provider
        .chat_with_tool_result(&conversation(), &update_call(), &ToolResult::success(), &catalog())
        .await
        .unwrap();
    assert_eq!(reply.text, "Done.");

    let body = received_body(&server).await;
    let contents = body["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[0]["role"], "user");
    assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "update_cell");
    assert_eq!(
        contents[2]["parts"][0]["functionResponse"]["response"]["result"],
        json!({ "success": true })
    );

    let decls = &body["tools"][0]["functionDeclarations"];
    assert_eq!(names(decls, "/name"), ["update_cell", "list_sheets"]);
    assert_eq!(decls[0]["parameters"]["required"], json!(["row", "column", "value"]));

    server.verify().await;
}

// ── Ollama ─────────────────────────────────────────────────────────

#[tokio::test]
async fn ollama_chat_and_health() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({ "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "test-model",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    { "function": { "name": "list_sheets", "arguments": {} } },
                    { "function": { "name": "read_sheet", "arguments": {} } }
                ]
            },
            "done": true
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&server)
        .await;

    let provider = create_provider(
        &ProviderConfig::new("ollama", "test-model").with_base_url(server.uri()),
    )
    .unwrap();

    let reply = provider.chat(&conversation(), &catalog()).await.unwrap();
    assert_eq!(reply.tool_call.unwrap().name, "list_sheets");

    let body = received_body(&server).await;
    assert_eq!(body["tools"][0]["type"], "function");
    assert_eq!(
        body["tools"][0]["function"]["parameters"]["required"],
        json!(["row", "column", "value"])
    );

    assert!(provider.health_check().await.unwrap());
}

#[tokio::test]
async fn ollama_unreachable_health_is_false() {
    let provider = create_provider(
        &ProviderConfig::new("ollama", "m").with_base_url("http://127.0.0.1:9"),
    )
    .unwrap();
    assert!(!provider.health_check().await.unwrap());
}
