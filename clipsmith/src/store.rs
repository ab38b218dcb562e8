//! HistoryStore - durable clipboard history
//!
//! Two states: Uninitialized until `init()` succeeds, Ready afterwards.
//! Every data operation on an Uninitialized store fails with
//! `ClipsmithError::NotInitialized`.
//!
//! Concurrency Model:
//! - Reads go straight to the r2d2 pool (WAL mode, readers never block each other)
//! - save / delete / toggle_pin additionally hold `write_lock`, so two writes
//!   never interleave

use crate::database::Database;
use crate::interface::{ClipboardEntry, ClipsmithError, HistoryStoreApi};
use chrono::Utc;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where the backing database lives
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Thread-safe clipboard history backed by SQLite
pub struct HistoryStore {
    location: Location,
    db: OnceCell<Database>,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    /// Create an uninitialized store for a database file
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::with_location(Location::File(path.as_ref().to_path_buf()))
    }

    /// Create an uninitialized store backed by an in-memory database
    pub fn in_memory() -> Self {
        Self::with_location(Location::Memory)
    }

    fn with_location(location: Location) -> Self {
        Self {
            location,
            db: OnceCell::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Whether `init()` has completed successfully
    #[cfg(test)]
    fn is_ready(&self) -> bool {
        self.db.get().is_some()
    }

    /// Path of the backing file, if any
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    /// Get the database size in bytes
    pub fn database_size(&self) -> Result<i64, ClipsmithError> {
        Ok(self.ready()?.database_size()?)
    }

    fn ready(&self) -> Result<&Database, ClipsmithError> {
        self.db.get().ok_or(ClipsmithError::NotInitialized)
    }
}

impl HistoryStoreApi for HistoryStore {
    // ─────────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────────

    fn init(&self) -> Result<(), ClipsmithError> {
        self.db.get_or_try_init(|| {
            let db = match &self.location {
                Location::File(path) => Database::open(path)?,
                Location::Memory => Database::open_in_memory()?,
            };
            info!(location = ?self.location, "History store ready");
            Ok::<_, ClipsmithError>(db)
        })?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────────

    fn list_all(&self) -> Result<Vec<ClipboardEntry>, ClipsmithError> {
        Ok(self.ready()?.fetch_all_entries()?)
    }

    fn search(&self, query: &str) -> Result<Vec<ClipboardEntry>, ClipsmithError> {
        Ok(self.ready()?.search_substring(query)?)
    }

    fn get(&self, id: i64) -> Result<Option<ClipboardEntry>, ClipsmithError> {
        Ok(self.ready()?.fetch_entry(id)?)
    }

    fn count(&self) -> Result<u64, ClipsmithError> {
        Ok(self.ready()?.count_entries()?)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────────

    fn save(&self, content: &str, kind: &str) -> Result<i64, ClipsmithError> {
        let db = self.ready()?;
        if content.is_empty() {
            return Err(ClipsmithError::InvalidInput("content is empty".to_string()));
        }

        let _guard = self.write_lock.lock();
        let id = db.insert_entry(content, kind, Utc::now())?;
        debug!(id, kind, len = content.len(), "Saved clipboard entry");
        Ok(id)
    }

    fn toggle_pin(&self, id: i64, pinned: bool) -> Result<bool, ClipsmithError> {
        let db = self.ready()?;
        let _guard = self.write_lock.lock();
        let updated = db.set_pinned(id, pinned)?;
        debug!(id, pinned, updated, "Pin state changed");
        Ok(updated)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Delete Operations
    // ─────────────────────────────────────────────────────────────────────────────

    fn delete(&self, id: i64) -> Result<bool, ClipsmithError> {
        let db = self.ready()?;
        let _guard = self.write_lock.lock();
        let removed = db.delete_entry(id)?;
        debug!(id, removed, "Delete requested");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::Category;

    fn ready_store() -> HistoryStore {
        let store = HistoryStore::in_memory();
        store.init().unwrap();
        store
    }

    #[test]
    fn test_operations_before_init_fail_fast() {
        let store = HistoryStore::in_memory();
        assert!(!store.is_ready());
        assert_eq!(store.save("x", "text"), Err(ClipsmithError::NotInitialized));
        assert_eq!(store.list_all(), Err(ClipsmithError::NotInitialized));
        assert_eq!(store.search("x"), Err(ClipsmithError::NotInitialized));
        assert_eq!(store.delete(1), Err(ClipsmithError::NotInitialized));
        assert_eq!(store.toggle_pin(1, true), Err(ClipsmithError::NotInitialized));
        assert_eq!(store.get(1), Err(ClipsmithError::NotInitialized));
    }

    #[test]
    fn test_failed_init_stays_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(dir.path());

        assert!(matches!(store.init(), Err(ClipsmithError::Storage(_))));
        assert!(!store.is_ready());
        assert_eq!(store.save("x", "text"), Err(ClipsmithError::NotInitialized));
        assert_eq!(store.list_all(), Err(ClipsmithError::NotInitialized));
    }

    #[test]
    fn test_init_is_idempotent() {
        let store = ready_store();
        let id = store.save("kept", "text").unwrap();
        store.init().unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().content, "kept");
    }

    #[test]
    fn test_save_and_list() {
        let store = ready_store();
        let id = store.save("hello world", "text").unwrap();
        assert!(id > 0);

        let entries = store.list_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "hello world");
        assert!(!entries[0].pinned);
        assert_eq!(entries[0].category(), Category::Text);
    }

    #[test]
    fn test_empty_content_rejected() {
        let store = ready_store();
        assert!(matches!(store.save("", "text"), Err(ClipsmithError::InvalidInput(_))));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_identical_captures_are_kept() {
        let store = ready_store();
        let first = store.save("same", "text").unwrap();
        let second = store.save("same", "text").unwrap();
        assert_ne!(first, second);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_delete_item() {
        let store = ready_store();
        let id = store.save("To delete", "text").unwrap();

        assert!(store.delete(id).unwrap());
        assert!(store.list_all().unwrap().is_empty());
        assert!(!store.delete(id).unwrap());
    }

    #[test]
    fn test_pin_moves_older_entry_first() {
        let store = ready_store();
        let a = store.save("A", "text").unwrap();
        let b = store.save("B", "text").unwrap();

        let ids: Vec<i64> = store.list_all().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![b, a]);

        assert!(store.toggle_pin(a, true).unwrap());
        let ids: Vec<i64> = store.list_all().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![a, b]);

        assert!(store.toggle_pin(a, false).unwrap());
        let ids: Vec<i64> = store.list_all().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn test_toggle_pin_missing_id() {
        let store = ready_store();
        assert!(!store.toggle_pin(42, true).unwrap());
    }

    #[test]
    fn test_search_filters_and_keeps_order() {
        let store = ready_store();
        store.save("foobar", "text").unwrap();
        store.save("baz", "text").unwrap();
        let pinned = store.save("old foo", "text").unwrap();
        store.toggle_pin(pinned, true).unwrap();
        store.save("new foo", "text").unwrap();

        let contents: Vec<String> = store
            .search("foo")
            .unwrap()
            .into_iter()
            .map(|e| e.content)
            .collect();
        assert_eq!(contents, vec!["old foo", "new foo", "foobar"]);
    }

    #[test]
    fn test_kind_is_stored_verbatim() {
        let store = ready_store();
        let id = store.save("{\"a\":1}", "text").unwrap();
        let entry = store.get(id).unwrap().unwrap();
        assert_eq!(entry.kind, "text");
        assert_eq!(entry.category(), Category::Json);
    }

    #[test]
    fn test_file_store_reports_path() {
        let store = HistoryStore::open("/tmp/clipsmith-test.db");
        assert_eq!(store.path(), Some(Path::new("/tmp/clipsmith-test.db")));
        assert!(HistoryStore::in_memory().path().is_none());
    }

    #[test]
    fn test_concurrent_writes_are_serialized() {
        let store = std::sync::Arc::new(ready_store());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        store.save(&format!("thread {t} item {i}"), "text").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.count().unwrap(), 40);
    }
}
