//! Error types for calendar operations.

use thiserror::Error;

/// Errors that can occur in calendar operations.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No credentials were configured for the calendar backend.
    #[error("calendar access is not configured")]
    NotConfigured,

    /// Error returned by the calendar service.
    #[error("calendar API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A time argument could not be interpreted.
    #[error("invalid time '{0}': expected ISO 8601 (YYYY-MM-DDTHH:MM:SS)")]
    InvalidTime(String),

    /// A timezone argument is not a known IANA name.
    #[error("unrecognized timezone '{0}'")]
    InvalidTimezone(String),

    /// The service URL could not be built.
    #[error("invalid calendar URL: {0}")]
    InvalidUrl(String),
}
