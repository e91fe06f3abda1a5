//! Tool declarations offered to the assistant.
//!
//! The function names here are the names [`ToolDispatcher`](crate::ToolDispatcher)
//! routes on.

use serde_json::json;
use twin_openai::ToolDeclaration;

pub const ADD_CALENDAR_EVENT: &str = "add_calendar_event";
pub const LIST_EVENTS: &str = "list_events";
pub const UPDATE_OR_CANCEL_EVENT: &str = "update_or_cancel_event";
pub const GET_CHAT_RESPONSE: &str = "get_chat_response";

/// Retrieval plus the four function tools.
pub fn assistant_tools() -> Vec<ToolDeclaration> {
    let mut tools = vec![ToolDeclaration::Retrieval];
    tools.extend(function_tools());
    tools
}

/// The function tools alone.
pub fn function_tools() -> Vec<ToolDeclaration> {
    vec![
        ToolDeclaration::function(
            ADD_CALENDAR_EVENT,
            "Add an event to Google Calendar",
            json!({
                "type": "object",
                "properties": {
                    "event_summary": {"type": "string"},
                    "event_location": {"type": "string"},
                    "event_description": {"type": "string"},
                    "start_time": {"type": "string"},
                    "end_time": {"type": "string"},
                    "start_time_zone": {"type": "string"},
                    "end_time_zone": {"type": "string"}
                },
                "required": [
                    "event_summary",
                    "event_location",
                    "event_description",
                    "start_time",
                    "end_time",
                    "start_time_zone",
                    "end_time_zone"
                ]
            }),
        ),
        ToolDeclaration::function(
            LIST_EVENTS,
            "List past and upcoming events from Google Calendar",
            json!({
                "type": "object",
                "properties": {
                    "calendar_id": {"type": "string"},
                    "max_results": {"type": "integer"},
                    "start_time": {
                        "type": "string",
                        "format": "date-time",
                        "description": "Start time in ISO 8601 format (YYYY-MM-DDTHH:MM:SS)"
                    },
                    "end_time": {
                        "type": "string",
                        "format": "date-time",
                        "description": "End time in ISO 8601 format (YYYY-MM-DDTHH:MM:SS)"
                    },
                    "timezone": {
                        "type": "string",
                        "description": "Timezone in which the start and end times are specified"
                    }
                },
                "required": ["calendar_id", "max_results"],
                "additionalProperties": true
            }),
        ),
        ToolDeclaration::function(
            UPDATE_OR_CANCEL_EVENT,
            "Update or cancel an event in Google Calendar",
            json!({
                "type": "object",
                "properties": {
                    "calendar_id": {"type": "string"},
                    "event_id": {"type": "string"},
                    "update_body": {"type": "object"}
                },
                "required": ["calendar_id", "event_id"]
            }),
        ),
        ToolDeclaration::function(
            GET_CHAT_RESPONSE,
            "Provide chat responses to questions about the digital twin.",
            json!({
                "type": "object",
                "properties": {
                    "user_input": {"type": "string", "description": "User's query"},
                    "model": {"type": "string", "description": "GPT model to use"}
                },
                "required": ["user_input"]
            }),
        ),
    ]
}
