//! Calendar functions the assistant can request.
//!
//! [`Calendar`] is the contract the tool dispatcher invokes by name. The
//! argument types mirror the keyword arguments declared to the assistant.
//! [`GoogleCalendar`] implements it against the Google Calendar REST API.

mod calendar;
mod error;
mod google;
mod types;

pub use calendar::Calendar;
pub use error::CalendarError;
pub use google::{DEFAULT_BASE_URL, GoogleCalendar, to_rfc3339};
pub use types::{EventChange, EventQuery, NewEvent};
