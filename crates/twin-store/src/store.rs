//! SQLite-backed thread store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::{LookupKey, StoreError};

/// Durable lookup key -> thread id map.
///
/// Holds one connection; SQLite's file locking keeps a single writer process
/// safe, but concurrent writers from several processes are not coordinated.
pub struct ThreadStore {
    conn: Mutex<Connection>,
}

impl ThreadStore {
    /// Open or create the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS threads (
                lookup_key TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL,
                stored_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )?;

        let threads = count_threads(&conn)?;
        info!(path = %path.display(), threads, "thread store opened");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Get the thread id stored for a key.
    pub fn lookup(&self, key: &LookupKey) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let thread_id = conn
            .query_row(
                "SELECT thread_id FROM threads WHERE lookup_key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(thread_id)
    }

    /// Store the thread id for a key, replacing any earlier one.
    pub fn store(&self, key: &LookupKey, thread_id: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO threads (lookup_key, thread_id, stored_at) VALUES (?1, ?2, datetime('now'))",
            params![key.as_str(), thread_id],
        )?;
        debug!(lookup_key = %key, thread_id, "stored thread");
        Ok(())
    }
}

/// Number of stored keys.
fn count_threads(conn: &Connection) -> Result<usize, StoreError> {
    let count = conn.query_row("SELECT COUNT(*) FROM threads", [], |row| {
        row.get::<_, usize>(0)
    })?;
    Ok(count)
}
