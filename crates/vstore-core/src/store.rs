//! Shared storage handle
//!
//! `Storage` wraps a [`BackingStore`] with JSON (de)serialization and the
//! degrade-to-noop policy. Cloning a handle shares the backend, the
//! disabled flag and the bookkeeping lock, so every `VersionStore` built
//! from clones of one handle sees the same store.
//!
//! ## Disabled stores
//!
//! On construction the handle writes, reads back and deletes a sentinel key.
//! If that round-trip fails the handle is marked disabled and every
//! operation becomes a no-op: reads return `None` (or the default), writes
//! do nothing, `get_all` returns `None`. Backend errors after that point are
//! logged and degrade the same way for the single operation.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use serde_json::Value;
use tracing::warn;

use crate::config::Config;
use crate::storage::codec::{deserialize, serialize};
use crate::storage::{BackingStore, MemoryBackend, SqliteBackend, StorageError, StorageResult};

/// Key written and removed by the availability self-test
pub const SENTINEL_KEY: &str = "__vstore__";

/// Handle to a shared backing store
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn BackingStore>,
    disabled: bool,
    bookkeeping: Arc<Mutex<()>>,
}

impl Storage {
    /// Wrap a backend, running the availability self-test
    pub fn new(backend: Arc<dyn BackingStore>) -> Self {
        let disabled = match self_test(backend.as_ref()) {
            Ok(()) => false,
            Err(e) => {
                warn!("Storage self-test failed, running disabled: {}", e);
                true
            }
        };

        Self {
            backend,
            disabled,
            bookkeeping: Arc::new(Mutex::new(())),
        }
    }

    /// Wrap a backend that is already known to be unusable
    pub fn disabled(backend: Arc<dyn BackingStore>) -> Self {
        Self {
            backend,
            disabled: true,
            bookkeeping: Arc::new(Mutex::new(())),
        }
    }

    /// Open the persistent local store described by `config`
    pub fn local(config: &Config) -> Result<Self> {
        let backend = SqliteBackend::open(&config.database_path())?;
        Ok(Self::new(Arc::new(backend)))
    }

    /// Create a fresh session store that lives as long as the process
    pub fn session() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Whether the store failed its self-test
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Store `value` under `key` verbatim, returning the stored value
    ///
    /// `None` removes the key instead.
    pub fn set(&self, key: &str, value: Option<Value>) -> Option<Value> {
        if self.disabled {
            return None;
        }
        let Some(value) = value else {
            self.remove(key);
            return None;
        };

        match self.backend.set(key, &serialize(&value)) {
            Ok(()) => Some(value),
            Err(e) => {
                degraded("set", key, &e);
                None
            }
        }
    }

    /// Read the value stored under `key` verbatim
    pub fn get(&self, key: &str) -> Option<Value> {
        if self.disabled {
            return None;
        }
        match self.backend.get(key) {
            Ok(raw) => deserialize(raw.as_deref()),
            Err(e) => {
                degraded("get", key, &e);
                None
            }
        }
    }

    /// Read `key`, falling back to `default` when absent or disabled
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&self, key: &str) {
        if self.disabled {
            return;
        }
        if let Err(e) = self.backend.remove(key) {
            degraded("remove", key, &e);
        }
    }

    /// Delete every key, bookkeeping included
    pub fn clear(&self) {
        if self.disabled {
            return;
        }
        if let Err(e) = self.backend.clear() {
            degraded("clear", "*", &e);
        }
    }

    /// Every raw key currently stored (empty when disabled)
    pub fn keys(&self) -> Vec<String> {
        if self.disabled {
            return Vec::new();
        }
        self.backend.keys().unwrap_or_else(|e| {
            degraded("keys", "*", &e);
            Vec::new()
        })
    }

    /// Snapshot of all entries, `None` when disabled
    ///
    /// Keys whose stored text decodes to nothing are left out.
    pub fn get_all(&self) -> Option<BTreeMap<String, Value>> {
        if self.disabled {
            return None;
        }
        let mut all = BTreeMap::new();
        self.for_each(|key, value| {
            if let Some(value) = value {
                all.insert(key.to_string(), value);
            }
        });
        Some(all)
    }

    /// Visit every raw key with its decoded value
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&str, Option<Value>),
    {
        if self.disabled {
            return;
        }
        for key in self.keys() {
            let value = self.get(&key);
            visitor(&key, value);
        }
    }

    /// Serialize read-modify-write sequences on bookkeeping records
    pub(crate) fn lock_bookkeeping(&self) -> MutexGuard<'_, ()> {
        self.bookkeeping
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

/// Round-trip the sentinel key through the backend
fn self_test(backend: &dyn BackingStore) -> StorageResult<()> {
    let expected = serialize(&Value::String(SENTINEL_KEY.to_string()));
    backend.set(SENTINEL_KEY, &expected)?;
    let actual = backend.get(SENTINEL_KEY)?;
    backend.remove(SENTINEL_KEY)?;

    if actual.as_deref() != Some(expected.as_str()) {
        return Err(StorageError::Disabled {
            reason: "sentinel value did not round-trip".to_string(),
        });
    }
    Ok(())
}

fn degraded(op: &str, key: &str, error: &StorageError) {
    warn!("Storage {} failed for '{}', treating as no-op: {}", op, key, error);
}
