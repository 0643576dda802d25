//! Durable usage counter backed by SQLite.
//! Increment is a single upsert with RETURNING, so concurrent callers never lose updates.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

use super::{CounterError, UsageCounter};

pub struct SqliteCounter {
    conn: Arc<Mutex<Connection>>,
    key: String,
}

impl SqliteCounter {
    /// Open (or create) the counter database at the given path.
    pub fn open(db_path: &Path, key: &str) -> Result<Self, CounterError> {
        let conn = Connection::open(db_path)?;
        // WAL lets readers proceed while another process increments
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        info!(path = %db_path.display(), "SQLite usage counter opened");
        Self::init(conn, key)
    }

    /// Counter in a private in-memory database.
    pub fn open_in_memory(key: &str) -> Result<Self, CounterError> {
        Self::init(Connection::open_in_memory()?, key)
    }

    fn init(conn: Connection, key: &str) -> Result<Self, CounterError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS counters (
                name TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            key: key.to_string(),
        })
    }

    /// Run a statement on the blocking pool so the runtime threads never wait on disk.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, CounterError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let key = self.key.clone();
        let result = tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn, &key)
        })
        .await?;
        result.map_err(|e| {
            warn!(error = %e, "usage counter query failed");
            CounterError::from(e)
        })
    }
}

#[async_trait]
impl UsageCounter for SqliteCounter {
    async fn read(&self) -> Result<u64, CounterError> {
        self.with_conn(|conn, key| {
            let value: Option<i64> = conn
                .query_row(
                    "SELECT value FROM counters WHERE name = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value.unwrap_or(0).max(0) as u64)
        })
        .await
    }

    async fn increment(&self) -> Result<u64, CounterError> {
        self.with_conn(|conn, key| {
            let value: i64 = conn.query_row(
                "INSERT INTO counters (name, value) VALUES (?1, 1)
                 ON CONFLICT(name) DO UPDATE SET value = value + 1
                 RETURNING value",
                params![key],
                |row| row.get(0),
            )?;
            Ok(value.max(0) as u64)
        })
        .await
    }
}
