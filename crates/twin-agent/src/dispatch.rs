//! Routing of tool calls to local handlers.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};
use twin_calendar::{Calendar, EventChange, EventQuery, NewEvent};
use twin_openai::{AssistantApi, ChatMessage};

use crate::DispatchError;
use crate::tools::{ADD_CALENDAR_EVENT, GET_CHAT_RESPONSE, LIST_EVENTS, UPDATE_OR_CANCEL_EVENT};

/// System prompt for `get_chat_response`.
pub const DIGITAL_TWIN_PROMPT: &str = "You are a digital twin who embodies the captured \
information about your human counterpart. Your job is to answer questions as best as possible \
in the voice of your human counterpart based on information provided and without information \
fabrication.";

/// Arguments of `get_chat_response`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatQuery {
    pub user_input: String,
    /// Overrides the configured chat model.
    #[serde(default)]
    pub model: Option<String>,
}

/// A decoded tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    AddEvent(NewEvent),
    ListEvents(EventQuery),
    UpdateOrCancelEvent(EventChange),
    ChatQuery(ChatQuery),
}

impl ToolInvocation {
    /// Decode a call by function name.
    pub fn decode(name: &str, arguments: Value) -> Result<Self, DispatchError> {
        match name {
            ADD_CALENDAR_EVENT => Ok(Self::AddEvent(parse_args(name, arguments)?)),
            LIST_EVENTS => Ok(Self::ListEvents(parse_args(name, arguments)?)),
            UPDATE_OR_CANCEL_EVENT => Ok(Self::UpdateOrCancelEvent(parse_args(name, arguments)?)),
            GET_CHAT_RESPONSE => Ok(Self::ChatQuery(parse_args(name, arguments)?)),
            other => Err(DispatchError::UnknownTool(other.to_string())),
        }
    }

    /// The function name this invocation was decoded from.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddEvent(_) => ADD_CALENDAR_EVENT,
            Self::ListEvents(_) => LIST_EVENTS,
            Self::UpdateOrCancelEvent(_) => UPDATE_OR_CANCEL_EVENT,
            Self::ChatQuery(_) => GET_CHAT_RESPONSE,
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, DispatchError> {
    serde_json::from_value(arguments).map_err(|source| DispatchError::InvalidArguments {
        tool: tool.to_string(),
        source,
    })
}

/// Executes tool calls against the calendar and the chat model.
pub struct ToolDispatcher {
    calendar: Arc<dyn Calendar>,
    api: Arc<dyn AssistantApi>,
    chat_model: String,
}

impl ToolDispatcher {
    pub fn new(
        calendar: Arc<dyn Calendar>,
        api: Arc<dyn AssistantApi>,
        chat_model: impl Into<String>,
    ) -> Self {
        Self {
            calendar,
            api,
            chat_model: chat_model.into(),
        }
    }

    /// Decode and run one tool call, returning its output text.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<String, DispatchError> {
        let invocation = ToolInvocation::decode(name, arguments).inspect_err(|e| {
            warn!(tool = %name, error = %e, "cannot dispatch tool call");
        })?;
        self.invoke(invocation).await
    }

    /// Run an already decoded call.
    pub async fn invoke(&self, invocation: ToolInvocation) -> Result<String, DispatchError> {
        let tool = invocation.name();
        info!(tool, "invoking tool");

        let calendar_error = |source| DispatchError::Calendar { tool, source };
        let value = match invocation {
            ToolInvocation::AddEvent(event) => self
                .calendar
                .add_event(&event)
                .await
                .map_err(calendar_error)?,
            ToolInvocation::ListEvents(query) => self
                .calendar
                .list_events(&query)
                .await
                .map_err(calendar_error)?,
            ToolInvocation::UpdateOrCancelEvent(change) => self
                .calendar
                .update_or_cancel_event(&change)
                .await
                .map_err(calendar_error)?,
            ToolInvocation::ChatQuery(query) => return Ok(self.chat_response(&query).await),
        };

        Ok(render(value))
    }

    /// Answer in the owner's voice. Failures become the output text.
    async fn chat_response(&self, query: &ChatQuery) -> String {
        let model = query.model.as_deref().unwrap_or(&self.chat_model);
        let messages = [
            ChatMessage::system(DIGITAL_TWIN_PROMPT),
            ChatMessage::user(query.user_input.as_str()),
        ];

        match self.api.chat_completion(model, &messages).await {
            Ok(text) => text,
            Err(e) => {
                warn!(model, error = %e, "chat response failed");
                format!("An error occurred: {e}")
            }
        }
    }
}

/// Strings pass through; other values become their JSON text.
fn render(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
