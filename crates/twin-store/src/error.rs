//! Error types for the thread store.

use thiserror::Error;

/// Errors that can occur reading or writing the thread store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite error (open, corrupt file, I/O).
    #[error("thread store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A previous holder of the connection panicked.
    #[error("thread store connection poisoned")]
    Poisoned,
}
