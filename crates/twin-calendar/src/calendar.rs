//! The calendar contract.

use async_trait::async_trait;
use serde_json::Value;

use crate::{CalendarError, EventChange, EventQuery, NewEvent};

/// Calendar operations exposed to the assistant.
///
/// Results are JSON values; the dispatcher renders them as the tool output.
#[async_trait]
pub trait Calendar: Send + Sync {
    /// `add_calendar_event`
    async fn add_event(&self, event: &NewEvent) -> Result<Value, CalendarError>;

    /// `list_events`
    async fn list_events(&self, query: &EventQuery) -> Result<Value, CalendarError>;

    /// `update_or_cancel_event`: patches the event when an update body is
    /// given, cancels it otherwise.
    async fn update_or_cancel_event(&self, change: &EventChange) -> Result<Value, CalendarError>;
}
