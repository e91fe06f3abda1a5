//! Error types for the hosted API client.

use thiserror::Error;

/// Errors that can occur when talking to the hosted assistants API.
#[derive(Debug, Error)]
pub enum OpenAiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading a local file for upload failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The API rejected the request.
    #[error("API error ({status}): {kind} - {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    /// Rate limited.
    #[error("rate limited{}", match retry_after_secs {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    })]
    RateLimited {
        /// Seconds to wait before retrying (from Retry-After header, optional).
        retry_after_secs: Option<u64>,
    },

    /// Response did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl OpenAiError {
    /// Whether the error is the API reporting that a resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, OpenAiError::Api { status: 404, .. })
    }
}
