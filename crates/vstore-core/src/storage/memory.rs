//! In-memory backend
//!
//! Used for the session scope and as the fake in tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{BackingStore, StorageError, StorageResult};

/// Process-local key-value map
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl BackingStore for MemoryBackend {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let backend = MemoryBackend::new();
        assert!(backend.is_empty());

        backend.set("a", "1").unwrap();
        assert_eq!(backend.get("a").unwrap(), Some("1".to_string()));
        assert_eq!(backend.len(), 1);

        backend.remove("a").unwrap();
        assert_eq!(backend.get("a").unwrap(), None);

        // Removing again is fine
        backend.remove("a").unwrap();
    }

    #[test]
    fn test_keys_and_clear() {
        let backend = MemoryBackend::new();
        backend.set("b", "2").unwrap();
        backend.set("a", "1").unwrap();

        assert_eq!(backend.keys().unwrap(), vec!["a", "b"]);

        backend.clear().unwrap();
        assert!(backend.keys().unwrap().is_empty());
    }
}
