//! Backing store layer
//!
//! A flat, synchronous, string-keyed store. Values are JSON text; the
//! version namespacing happens one level up in [`crate::VersionStore`].
//!
//! ## Backends
//!
//! - **SQLite** (`SqliteBackend`): persistent "local" scope, one row per key
//! - **Memory** (`MemoryBackend`): "session" scope, gone when the process exits

pub mod codec;
pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::SqliteBackend;

/// A raw key-value store holding JSON text
///
/// Implementations must be safe to share between `Storage` handles.
pub trait BackingStore: Send + Sync {
    /// Read the raw text stored under `key`
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store raw text under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Delete every key
    fn clear(&self) -> StorageResult<()>;

    /// Enumerate every key currently stored
    fn keys(&self) -> StorageResult<Vec<String>>;
}
