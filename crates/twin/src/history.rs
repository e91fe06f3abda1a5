//! Rendering of stored conversations.

use chrono::DateTime;
use chrono_tz::Tz;
use twin_openai::Message;
use twin_store::LookupKey;

/// One line per message: `[YYYY-MM-DD HH:MM:SS] role: text`.
pub fn format_message(message: &Message, tz: Tz) -> String {
    let timestamp = DateTime::from_timestamp(message.created_at, 0)
        .map(|t| t.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown time".to_string());
    let text = message.text().unwrap_or_else(|| "(no text)".to_string());
    format!("[{timestamp}] {}: {text}", message.role)
}

pub fn not_found(key: &LookupKey) -> String {
    format!("Thread with lookupId {key} not found.")
}
