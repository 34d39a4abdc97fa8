//! vstore Core Library
//!
//! Version-namespaced key-value storage. Applications store values under
//! plain keys; the store suffixes them with the release version so an
//! upgrade purges everything the previous release left behind, except the
//! keys the application chose to guard.
//!
//! # Quick Start
//!
//! ```
//! use serde_json::json;
//! use vstore_core::{Storage, VersionStore};
//!
//! let storage = Storage::session();
//! let store = VersionStore::new(storage.clone(), "1.0.0", ["token"]).unwrap();
//! store.set("draft", json!("hello"));
//! assert_eq!(store.resolve_key("draft"), "draft_1.0.0");
//!
//! // Upgrading drops unguarded keys from the old release
//! let store = VersionStore::new(storage, "2.0.0", ["token"]).unwrap();
//! assert!(store.get("draft").is_none());
//! ```
//!
//! # Modules
//!
//! - `version_store`: Key namespacing and the reconciliation protocol
//! - `store`: Shared storage handle (serialization, disabled mode)
//! - `storage`: Backing store trait with SQLite and in-memory backends
//! - `config`: Application configuration

pub mod config;
pub mod storage;
pub mod store;
pub mod version_store;

pub use config::Config;
pub use storage::{BackingStore, MemoryBackend, SqliteBackend, StorageError, StorageResult};
pub use store::Storage;
pub use version_store::{Reconciliation, VersionStore, VersionStoreError};
