//! SQLite database layer for clipboard history
//!
//! Single `clipboard_history` table. Uses r2d2 connection pooling so reads
//! never wait on each other; write serialization lives one level up in the store.

use crate::interface::ClipboardEntry;
use crate::models::{format_db_timestamp, parse_db_timestamp};
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Canonical listing order: pinned first, then newest first.
/// `id` breaks ties between rows captured within the same millisecond.
const LISTING_ORDER: &str = "ORDER BY is_pinned DESC, timestamp DESC, id DESC";

/// Upper bound on waiting for a pooled connection
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

const ENTRY_COLUMNS: &str = "id, content, timestamp, is_pinned, type";

/// Thread-safe database wrapper using connection pooling
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open or create a database at the given path with connection pooling
    pub fn open<P: AsRef<Path>>(path: P) -> DatabaseResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // Unopenable paths fail here, not after the pool's connection timeout
        rusqlite::Connection::open(path)?;

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                PRAGMA busy_timeout=5000;
                ",
            )?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(8)
            .connection_timeout(POOL_CONNECTION_TIMEOUT)
            .build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> DatabaseResult<Self> {
        // In-memory needs a single connection that is never recycled to keep its state
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(SqliteConnectionManager::memory())?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Get a connection from the pool
    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Create the history table if it does not exist yet
    fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS clipboard_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                is_pinned INTEGER DEFAULT 0,
                type TEXT DEFAULT 'text'
            );

            CREATE INDEX IF NOT EXISTS idx_history_order
                ON clipboard_history(is_pinned, timestamp);
        "#,
        )?;

        Ok(())
    }

    /// Get the database size in bytes
    pub fn database_size(&self) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        let page_count: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
        let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
        Ok(page_count * page_size)
    }

    /// Count stored entries
    pub fn count_entries(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM clipboard_history", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Insert a new entry, returns the row ID
    pub fn insert_entry(
        &self,
        content: &str,
        kind: &str,
        captured_at: DateTime<Utc>,
    ) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO clipboard_history (content, timestamp, is_pinned, type) VALUES (?1, ?2, 0, ?3)",
            params![content, format_db_timestamp(captured_at), kind],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Fetch every entry in listing order
    pub fn fetch_all_entries(&self) -> DatabaseResult<Vec<ClipboardEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM clipboard_history {LISTING_ORDER}");
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([], Self::row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Fetch a single entry by ID
    pub fn fetch_entry(&self, id: i64) -> DatabaseResult<Option<ClipboardEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM clipboard_history WHERE id = ?1");
        let entry = conn
            .query_row(&sql, [id], Self::row_to_entry)
            .optional()?;
        Ok(entry)
    }

    /// Substring search over content, in listing order.
    /// SQLite `LIKE` folds ASCII letters only, so matching is ASCII case-insensitive.
    pub fn search_substring(&self, query: &str) -> DatabaseResult<Vec<ClipboardEntry>> {
        let conn = self.get_conn()?;
        let pattern = format!("%{}%", escape_like(query));
        let sql = format!(
            r#"SELECT {ENTRY_COLUMNS} FROM clipboard_history
               WHERE content LIKE ?1 ESCAPE '\'
               {LISTING_ORDER}"#
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([pattern], Self::row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Set the pin flag. Returns whether a row was updated.
    pub fn set_pinned(&self, id: i64, pinned: bool) -> DatabaseResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE clipboard_history SET is_pinned = ?1 WHERE id = ?2",
            params![pinned as i64, id],
        )?;
        Ok(changed > 0)
    }

    /// Delete an entry by ID. Returns whether a row was removed.
    pub fn delete_entry(&self, id: i64) -> DatabaseResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute("DELETE FROM clipboard_history WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    /// Convert a database row to a ClipboardEntry
    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<ClipboardEntry> {
        let id: i64 = row.get(0)?;
        let content: String = row.get(1)?;
        let timestamp_str: Option<String> = row.get(2)?;
        let is_pinned: Option<i64> = row.get(3)?;
        let kind: Option<String> = row.get(4)?;

        // Unparseable timestamps come back as the epoch rather than failing the whole listing
        let captured_at = timestamp_str
            .as_deref()
            .and_then(parse_db_timestamp)
            .unwrap_or_default();

        Ok(ClipboardEntry {
            id,
            content,
            captured_at,
            pinned: is_pinned.unwrap_or(0) != 0,
            kind: kind.unwrap_or_else(|| "text".to_string()),
        })
    }
}

/// Escape LIKE wildcards so the query matches literally
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
