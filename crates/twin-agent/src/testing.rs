//! In-memory fakes for the assistant service and the calendar.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use twin_calendar::{Calendar, CalendarError, EventChange, EventQuery, NewEvent};
use twin_openai::{
    Assistant, AssistantApi, ChatMessage, CreateAssistantRequest, FileObject, Message,
    OpenAiError, Run, SortOrder, Thread, ToolOutput,
};

pub(crate) fn run(status: &str) -> Run {
    serde_json::from_value(json!({
        "id": "run_1",
        "thread_id": "thread_1",
        "assistant_id": "asst_1",
        "status": status,
        "created_at": 1_700_000_000
    }))
    .unwrap()
}

pub(crate) fn failed_run(code: &str, message: &str) -> Run {
    serde_json::from_value(json!({
        "id": "run_1",
        "thread_id": "thread_1",
        "assistant_id": "asst_1",
        "status": "failed",
        "last_error": {"code": code, "message": message},
        "created_at": 1_700_000_000
    }))
    .unwrap()
}

/// A run waiting on the given `(call_id, function_name, arguments_json)` calls.
pub(crate) fn run_requiring(calls: &[(&str, &str, &str)]) -> Run {
    let tool_calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, arguments)| {
            json!({
                "id": id,
                "type": "function",
                "function": {"name": name, "arguments": arguments}
            })
        })
        .collect();
    serde_json::from_value(json!({
        "id": "run_1",
        "thread_id": "thread_1",
        "assistant_id": "asst_1",
        "status": "requires_action",
        "required_action": {
            "type": "submit_tool_outputs",
            "submit_tool_outputs": {"tool_calls": tool_calls}
        },
        "created_at": 1_700_000_000
    }))
    .unwrap()
}

fn message(id: &str, thread_id: &str, role: &str, text: &str, created_at: i64) -> Message {
    serde_json::from_value(json!({
        "id": id,
        "thread_id": thread_id,
        "role": role,
        "created_at": created_at,
        "content": [{"type": "text", "text": {"value": text, "annotations": []}}]
    }))
    .unwrap()
}

/// Scripted stand-in for the assistant service.
///
/// `retrieve_run` pops statuses in order and repeats the last one.
pub(crate) struct ScriptedApi {
    runs: Mutex<VecDeque<Run>>,
    reply: Option<String>,
    chat_reply: Result<String, String>,
    thread_missing: bool,
    pub submissions: Mutex<Vec<Vec<ToolOutput>>>,
    pub cancelled_runs: Mutex<Vec<String>>,
    pub user_messages: Mutex<Vec<(String, String)>>,
    pub chat_requests: Mutex<Vec<(String, Vec<ChatMessage>)>>,
    pub uploads: Mutex<Vec<PathBuf>>,
    pub created_assistants: Mutex<Vec<CreateAssistantRequest>>,
    pub threads_created: AtomicUsize,
    pub runs_created: AtomicUsize,
    pub status_checks: AtomicUsize,
}

impl ScriptedApi {
    pub fn new(runs: Vec<Run>) -> Self {
        Self {
            runs: Mutex::new(runs.into()),
            reply: None,
            chat_reply: Ok("chat reply".to_string()),
            thread_missing: false,
            submissions: Mutex::new(Vec::new()),
            cancelled_runs: Mutex::new(Vec::new()),
            user_messages: Mutex::new(Vec::new()),
            chat_requests: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            created_assistants: Mutex::new(Vec::new()),
            threads_created: AtomicUsize::new(0),
            runs_created: AtomicUsize::new(0),
            status_checks: AtomicUsize::new(0),
        }
    }

    pub fn with_reply(mut self, reply: &str) -> Self {
        self.reply = Some(reply.to_string());
        self
    }

    pub fn with_chat_failure(mut self, message: &str) -> Self {
        self.chat_reply = Err(message.to_string());
        self
    }

    /// Stored threads no longer exist on the service.
    pub fn with_missing_threads(mut self) -> Self {
        self.thread_missing = true;
        self
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl AssistantApi for ScriptedApi {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, OpenAiError> {
        Ok(serde_json::from_value(json!({
            "id": assistant_id,
            "model": "gpt-4-1106-preview",
            "created_at": 1_700_000_000
        }))?)
    }

    async fn create_assistant(
        &self,
        request: &CreateAssistantRequest,
    ) -> Result<Assistant, OpenAiError> {
        let mut created = self.created_assistants.lock().unwrap();
        created.push(request.clone());
        Ok(serde_json::from_value(json!({
            "id": format!("asst_new_{}", created.len()),
            "model": request.model,
            "created_at": 1_700_000_000
        }))?)
    }

    async fn upload_file(&self, path: &Path) -> Result<FileObject, OpenAiError> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(path.to_path_buf());
        Ok(serde_json::from_value(json!({
            "id": format!("file_{}", uploads.len()),
            "filename": path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            "purpose": "assistants",
            "bytes": 1
        }))?)
    }

    async fn create_thread(&self) -> Result<Thread, OpenAiError> {
        let n = self.threads_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(serde_json::from_value(json!({
            "id": format!("thread_{n}"),
            "created_at": 1_700_000_000
        }))?)
    }

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, OpenAiError> {
        if self.thread_missing {
            return Err(OpenAiError::Api {
                status: 404,
                kind: "invalid_request_error".to_string(),
                message: format!("No thread found with id '{thread_id}'."),
            });
        }
        Ok(serde_json::from_value(json!({
            "id": thread_id,
            "created_at": 1_700_000_000
        }))?)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<Message, OpenAiError> {
        self.user_messages
            .lock()
            .unwrap()
            .push((thread_id.to_string(), content.to_string()));
        Ok(message("msg_user", thread_id, "user", content, 1_700_000_001))
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        order: SortOrder,
    ) -> Result<Vec<Message>, OpenAiError> {
        let mut messages: Vec<Message> = self
            .user_messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(thread, _)| thread == thread_id)
            .enumerate()
            .map(|(i, (_, text))| {
                message(&format!("msg_user_{i}"), thread_id, "user", text, 1_700_000_001 + i as i64)
            })
            .collect();
        if let Some(reply) = &self.reply {
            messages.push(message("msg_reply", thread_id, "assistant", reply, 1_700_000_100));
        }
        if matches!(order, SortOrder::Desc) {
            messages.reverse();
        }
        Ok(messages)
    }

    async fn create_run(&self, _thread_id: &str, _assistant_id: &str) -> Result<Run, OpenAiError> {
        self.runs_created.fetch_add(1, Ordering::SeqCst);
        Ok(run("queued"))
    }

    async fn retrieve_run(&self, _thread_id: &str, _run_id: &str) -> Result<Run, OpenAiError> {
        self.status_checks.fetch_add(1, Ordering::SeqCst);
        let mut runs = self.runs.lock().unwrap();
        let next = if runs.len() > 1 {
            runs.pop_front()
        } else {
            runs.front().cloned()
        };
        next.ok_or_else(|| OpenAiError::InvalidResponse("no scripted run".to_string()))
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        _run_id: &str,
        tool_outputs: &[ToolOutput],
    ) -> Result<Run, OpenAiError> {
        self.submissions.lock().unwrap().push(tool_outputs.to_vec());
        Ok(run("queued"))
    }

    async fn cancel_run(&self, _thread_id: &str, run_id: &str) -> Result<Run, OpenAiError> {
        self.cancelled_runs.lock().unwrap().push(run_id.to_string());
        Ok(run("cancelling"))
    }

    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, OpenAiError> {
        self.chat_requests
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec()));
        self.chat_reply
            .clone()
            .map_err(OpenAiError::InvalidResponse)
    }
}

/// Calendar that records calls and answers with canned values.
#[derive(Default)]
pub(crate) struct RecordingCalendar {
    pub calls: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingCalendar {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn record(&self, call: String) -> Result<(), CalendarError> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            Err(CalendarError::NotConfigured)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Calendar for RecordingCalendar {
    async fn add_event(&self, event: &NewEvent) -> Result<Value, CalendarError> {
        self.record(format!("add:{}", event.event_summary))?;
        Ok(json!({"status": "created", "event": event.event_summary}))
    }

    async fn list_events(&self, query: &EventQuery) -> Result<Value, CalendarError> {
        self.record(format!("list:{}:{}", query.calendar_id, query.max_results))?;
        Ok(json!({"count": 0, "events": []}))
    }

    async fn update_or_cancel_event(&self, change: &EventChange) -> Result<Value, CalendarError> {
        self.record(format!("change:{}", change.event_id))?;
        Ok(match change.update_body {
            Some(_) => json!({"status": "updated", "event": {"id": change.event_id}}),
            None => json!({"status": "cancelled", "event_id": change.event_id}),
        })
    }
}
