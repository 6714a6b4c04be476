//! Tool System
//!
//! Neutral tool-call model and the dispatcher that routes calls to operations.
//! Tools are registered at start-up and invoked by the agent loop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// String-keyed map of JSON-compatible argument values
pub type Arguments = Map<String, Value>;

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: Arguments,

    /// Vendor correlation ID, when the vendor assigns one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            name: name.into(),
            arguments,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Build a call from a JSON value, which must be an object (or null)
    pub fn from_value(name: impl Into<String>, arguments: Value) -> Result<Self> {
        let name = name.into();
        match arguments {
            Value::Object(map) => Ok(Self::new(name, map)),
            Value::Null => Ok(Self::new(name, Map::new())),
            other => Err(AgentError::Parse(format!(
                "arguments for '{name}' must be an object, got {other}"
            ))),
        }
    }

    /// Build a call from JSON-encoded arguments; an empty string means no arguments
    pub fn from_json_str(name: impl Into<String>, arguments: &str) -> Result<Self> {
        let name = name.into();
        if arguments.trim().is_empty() {
            return Ok(Self::new(name, Map::new()));
        }
        let value: Value = serde_json::from_str(arguments)
            .map_err(|e| AgentError::Parse(format!("arguments for '{name}': {e}")))?;
        Self::from_value(name, value)
    }

    /// Arguments as a JSON object value
    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone())
    }

    /// Optional string argument
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }

    /// Required string argument
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.str_arg(key).ok_or_else(|| missing(key))
    }

    /// Required argument rendered as text (numbers and booleans are accepted)
    pub fn require_text(&self, key: &str) -> Result<String> {
        match self.arguments.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Null) | None => Err(missing(key)),
            Some(other) => Ok(other.to_string()),
        }
    }

    /// Required positive integer argument (numeric strings are accepted)
    pub fn require_index(&self, key: &str) -> Result<usize> {
        let value = self.arguments.get(key).ok_or_else(|| missing(key))?;
        let parsed = match value {
            Value::Number(n) => n.as_u64().or_else(|| whole_number(n.as_f64()?)),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        parsed
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| {
                AgentError::ToolValidation(format!(
                    "Parameter '{key}' must be a non-negative integer, got {value}"
                ))
            })
    }
}

/// Some vendors encode integers as floats, e.g. `3.0`
fn whole_number(value: f64) -> Option<u64> {
    (value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64).then(|| value as u64)
}

fn missing(key: &str) -> AgentError {
    AgentError::ToolValidation(format!("Missing required parameter: {key}"))
}

/// Result from tool execution: an arbitrary JSON object.
///
/// Failures are objects with a single `error` key holding a readable message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolResult(Map<String, Value>);

impl ToolResult {
    /// Wrap a JSON value; non-object values are stored under `result`
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            other => {
                let mut map = Map::new();
                map.insert("result".into(), other);
                Self(map)
            }
        }
    }

    /// `{"success": true}`
    pub fn success() -> Self {
        Self::from_value(json!({ "success": true }))
    }

    /// `{"error": message}`
    pub fn error(message: impl Into<String>) -> Self {
        Self::from_value(json!({ "error": message.into() }))
    }

    /// Error message, if this is an error payload
    pub fn error_message(&self) -> Option<&str> {
        self.0.get("error").and_then(Value::as_str)
    }

    pub fn is_error(&self) -> bool {
        self.0.contains_key("error")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// JSON encoding used when injecting the result into a vendor request
    pub fn to_json_string(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, integer, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Schema for extra keys of an object parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Value>,
}

impl ParameterSchema {
    pub fn new(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: false,
            additional_properties: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn additional_properties(mut self, schema: Value) -> Self {
        self.additional_properties = Some(schema);
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), json!(self.param_type));
        prop.insert("description".into(), json!(self.description));
        if let Some(extra) = &self.additional_properties {
            prop.insert("additionalProperties".into(), extra.clone());
        }
        Value::Object(prop)
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,

    /// Whether the tool writes to external state; failures of such tools are
    /// logged as possibly partial
    #[serde(default)]
    pub has_side_effects: bool,
}

impl ToolSchema {
    /// JSON-schema object describing the arguments
    pub fn parameters_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.to_json_schema()))
            .collect();

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });

        let required = self.required_parameters();
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    /// Names of required parameters, in declaration order
    pub fn required_parameters(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }
}

/// Tool trait - implement to add new operations
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult>;

    /// Validate arguments before execution
    fn validate(&self, call: &ToolCall) -> Result<()> {
        let schema = self.schema();

        for param in schema.parameters.iter().filter(|p| p.required) {
            match call.arguments.get(&param.name) {
                None | Some(Value::Null) => {
                    return Err(missing(&param.name));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

/// Routes tool calls to registered operations.
///
/// The catalog is fixed after start-up; `dispatch` never returns an error.
pub struct ToolDispatcher {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl Default for ToolDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.schema().name;
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Execute a tool call, folding every failure into an `{error}` payload
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            let err = AgentError::ToolNotFound(format!("Unknown function: {}", call.name));
            tracing::warn!(tool = %call.name, "Unknown tool requested");
            return ToolResult::error(err.tool_message());
        };

        if let Err(e) = tool.validate(call) {
            tracing::warn!(tool = %call.name, error = %e, "Tool arguments rejected");
            return ToolResult::error(e.tool_message());
        }

        match tool.execute(call).await {
            Ok(result) => result,
            Err(e) => {
                if tool.schema().has_side_effects {
                    tracing::warn!(tool = %call.name, error = %e, "Write tool failed; the change may be partial");
                } else {
                    tracing::warn!(tool = %call.name, error = %e, "Tool failed");
                }
                ToolResult::error(e.tool_message())
            }
        }
    }

    /// Whether `name` is a registered tool that writes to external state
    pub fn has_side_effects(&self, name: &str) -> bool {
        self.tools
            .get(name)
            .is_some_and(|t| t.schema().has_side_effects)
    }

    /// All tool schemas, in registration order
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.schema())
            .collect()
    }

    /// Get tool names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
