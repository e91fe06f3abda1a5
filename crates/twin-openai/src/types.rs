//! Wire types for the assistants and chat completions endpoints.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Assistants
// ============================================================================

/// A tool the assistant is allowed to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDeclaration {
    /// Retrieval over files attached to the assistant.
    Retrieval,
    /// Sandboxed code execution, which can also read attached files.
    CodeInterpreter,
    /// A function executed locally by the caller.
    Function { function: FunctionDefinition },
}

impl ToolDeclaration {
    /// Declare a locally executed function.
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self::Function {
            function: FunctionDefinition {
                name: name.into(),
                description: Some(description.into()),
                parameters,
            },
        }
    }

    /// Whether this tool lets the assistant read uploaded files.
    pub fn reads_files(&self) -> bool {
        matches!(self, Self::Retrieval | Self::CodeInterpreter)
    }

    /// The function name, for function tools.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            Self::Function { function } => Some(&function.name),
            _ => None,
        }
    }
}

/// Schema of a locally executed function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema describing the function's arguments object.
    pub parameters: Value,
}

/// Request body for creating an assistant.
#[derive(Debug, Clone, Serialize)]
pub struct CreateAssistantRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDeclaration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_ids: Vec<String>,
}

/// A remote assistant configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub model: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

/// An uploaded file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub bytes: u64,
}

// ============================================================================
// Threads and messages
// ============================================================================

/// A remote conversation thread.
#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

/// Author of a thread message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in a thread.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    pub role: Role,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub content: Vec<MessageContent>,
    #[serde(default)]
    pub run_id: Option<String>,
}

impl Message {
    /// Text parts of the message joined by newlines, if it has any.
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|c| match c {
                MessageContent::Text { text } => Some(text.value.as_str()),
                MessageContent::Other => None,
            })
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

/// One content part of a message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: MessageText },
    /// Image files and any part type this client does not render.
    #[serde(other)]
    Other,
}

/// Text content with its annotations.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageText {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Value>,
}

/// Sort order for list endpoints, by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Paginated list envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

// ============================================================================
// Runs
// ============================================================================

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Expired,
    Incomplete,
    /// A status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Expired => "expired",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Unknown => "unknown",
        }
    }

    /// Whether the run has stopped without completing.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            RunStatus::Cancelled | RunStatus::Failed | RunStatus::Expired | RunStatus::Incomplete
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution of an assistant against a thread.
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub assistant_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<RunError>,
    #[serde(default)]
    pub created_at: i64,
}

impl Run {
    /// Tool calls the run is waiting on, if any.
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        self.required_action
            .as_ref()
            .map(|a| a.submit_tool_outputs.tool_calls.as_slice())
            .unwrap_or(&[])
    }
}

/// What a paused run needs from the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct RequiredAction {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub submit_tool_outputs: SubmitToolOutputs,
}

/// Tool calls awaiting outputs.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<ToolCall>,
}

/// A request from the run to execute a local function.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub function: FunctionCall,
}

/// Function name and arguments of a tool call.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments string (some callers send a decoded object).
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    /// Decode the call's arguments into a JSON value.
    ///
    /// An empty arguments string decodes to an empty object.
    pub fn arguments(&self) -> Result<Value, serde_json::Error> {
        match &self.function.arguments {
            Value::String(s) if s.trim().is_empty() => Ok(Value::Object(Default::default())),
            Value::String(s) => serde_json::from_str(s),
            Value::Null => Ok(Value::Object(Default::default())),
            other => Ok(other.clone()),
        }
    }
}

/// Output for one tool call, submitted back to the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// Why a run stopped, as reported by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    pub code: String,
    pub message: String,
}

// ============================================================================
// Chat completions
// ============================================================================

/// A chat completions message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from the chat completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatCompletion {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_tool_declaration_wire_format() {
        let retrieval = serde_json::to_value(ToolDeclaration::Retrieval).unwrap();
        assert_eq!(retrieval, json!({"type": "retrieval"}));

        let function = ToolDeclaration::function(
            "list_events",
            "List events",
            json!({"type": "object", "properties": {}}),
        );
        assert_eq!(
            serde_json::to_value(&function).unwrap(),
            json!({
                "type": "function",
                "function": {
                    "name": "list_events",
                    "description": "List events",
                    "parameters": {"type": "object", "properties": {}}
                }
            })
        );
        assert_eq!(function.function_name(), Some("list_events"));
        assert!(!function.reads_files());
        assert!(ToolDeclaration::CodeInterpreter.reads_files());
    }

    #[test]
    fn test_run_status_unknown_value() {
        let status: RunStatus = serde_json::from_value(json!("something_new")).unwrap();
        assert_eq!(status, RunStatus::Unknown);

        let status: RunStatus = serde_json::from_value(json!("requires_action")).unwrap();
        assert_eq!(status, RunStatus::RequiresAction);
        assert_eq!(status.to_string(), "requires_action");
    }

    #[test]
    fn test_run_pending_tool_calls() {
        let run: Run = serde_json::from_value(json!({
            "id": "run_1",
            "thread_id": "thread_1",
            "assistant_id": "asst_1",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "list_events", "arguments": "{\"calendar_id\":\"primary\",\"max_results\":5}"}
                    }]
                }
            }
        }))
        .unwrap();

        let calls = run.pending_tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "list_events");
        assert_eq!(
            calls[0].arguments().unwrap(),
            json!({"calendar_id": "primary", "max_results": 5})
        );
    }

    #[test]
    fn test_tool_call_arguments_variants() {
        let call = |arguments: Value| ToolCall {
            id: "call_1".to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: "f".to_string(),
                arguments,
            },
        };

        assert_eq!(call(json!("")).arguments().unwrap(), json!({}));
        assert_eq!(call(Value::Null).arguments().unwrap(), json!({}));
        assert_eq!(call(json!({"a": 1})).arguments().unwrap(), json!({"a": 1}));
        assert!(call(json!("{not json")).arguments().is_err());
    }

    #[test]
    fn test_message_text_skips_non_text_parts() {
        let message: Message = serde_json::from_value(json!({
            "id": "msg_1",
            "thread_id": "thread_1",
            "role": "assistant",
            "created_at": 1700000000,
            "content": [
                {"type": "image_file", "image_file": {"file_id": "file_1"}},
                {"type": "text", "text": {"value": "Hello", "annotations": []}},
                {"type": "text", "text": {"value": "there", "annotations": []}}
            ]
        }))
        .unwrap();

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.text().as_deref(), Some("Hello\nthere"));
    }
}
