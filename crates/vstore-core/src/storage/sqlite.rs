//! SQLite backend
//!
//! Persistent store for the local scope. Each key is one row in `entries`;
//! writes are upserts stamped with the current UTC time.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::schema::{init_schema, needs_init};
use super::{BackingStore, StorageError, StorageResult};

/// SQLite-backed key-value store
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        debug!("Opened SQLite store at {:?}", path);
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        if needs_init(&conn) {
            init_schema(&conn)?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Time of the most recent write, if any entries exist
    pub fn last_modified(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let conn = self.lock()?;
        let millis: Option<i64> =
            conn.query_row("SELECT MAX(updated_at) FROM entries", [], |row| row.get(0))?;
        Ok(millis.and_then(|ms| Utc.timestamp_millis_opt(ms).single()))
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl BackingStore for SqliteBackend {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM entries WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().timestamp_millis()],
        )
        .map_err(|e| StorageError::from_sqlite(e, key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM entries WHERE key = ?", params![key])?;
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM entries", [])?;
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key FROM entries ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove() {
        let backend = SqliteBackend::open_in_memory().unwrap();

        assert_eq!(backend.get("foo_1.0.0").unwrap(), None);

        backend.set("foo_1.0.0", "\"bar\"").unwrap();
        assert_eq!(backend.get("foo_1.0.0").unwrap(), Some("\"bar\"".to_string()));

        // Upsert replaces
        backend.set("foo_1.0.0", "\"baz\"").unwrap();
        assert_eq!(backend.get("foo_1.0.0").unwrap(), Some("\"baz\"".to_string()));

        backend.remove("foo_1.0.0").unwrap();
        assert_eq!(backend.get("foo_1.0.0").unwrap(), None);
    }

    #[test]
    fn test_keys_sorted_and_clear() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.set("version", "\"1.0.0\"").unwrap();
        backend.set("guarded", "[]").unwrap();
        backend.set("foo_1.0.0", "1").unwrap();

        assert_eq!(backend.keys().unwrap(), vec!["foo_1.0.0", "guarded", "version"]);

        backend.clear().unwrap();
        assert!(backend.keys().unwrap().is_empty());
    }

    #[test]
    fn test_last_modified() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert!(backend.last_modified().unwrap().is_none());

        let before = Utc::now().timestamp_millis();
        backend.set("a", "1").unwrap();
        let stamp = backend.last_modified().unwrap().unwrap();
        assert!(stamp.timestamp_millis() >= before);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("vstore.db");

        {
            let backend = SqliteBackend::open(&path).unwrap();
            backend.set("version", "\"2.0.0\"").unwrap();
        }

        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(backend.get("version").unwrap(), Some("\"2.0.0\"".to_string()));
    }
}
