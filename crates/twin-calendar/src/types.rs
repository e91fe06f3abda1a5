//! Argument types for calendar operations.
//!
//! Field names match the keyword arguments the assistant sends.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Arguments of `add_calendar_event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub event_summary: String,
    pub event_location: String,
    pub event_description: String,
    pub start_time: String,
    pub end_time: String,
    pub start_time_zone: String,
    pub end_time_zone: String,
}

/// Arguments of `list_events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventQuery {
    pub calendar_id: String,
    pub max_results: u32,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    /// Timezone the start and end times are given in.
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Arguments of `update_or_cancel_event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventChange {
    pub calendar_id: String,
    pub event_id: String,
    /// Fields to patch; absent means cancel the event.
    #[serde(default)]
    pub update_body: Option<Value>,
}
