//! Version-namespaced view over a [`Storage`] handle
//!
//! Every key an application stores is suffixed with the release version
//! (`foo` becomes `foo_1.0.0`), except keys in the guarded set, which are
//! stored verbatim and survive upgrades. Two reserved records drive the
//! protocol:
//!
//! - `version`: the last version that reconciled the store
//! - `guarded`: JSON array of keys that are never suffixed
//!
//! ## Reconciliation
//!
//! Runs once inside [`VersionStore::new`]:
//!
//! 1. Read the persisted `version` and `guarded` records.
//! 2. The version is legal if it equals ours (plain string equality).
//! 3. The guarded record is legal if it is a non-empty array of strings
//!    that contains both reserved keys. A legal record's keys are adopted
//!    into our guarded set, so guards registered by earlier instances hold.
//! 4. If either check fails, rewrite both records and delete every key that
//!    is not guarded. This is a full purge, not just the old version's keys.
//! 5. Otherwise, if we guard keys the record does not list yet, persist the
//!    merged set. Nothing is deleted.
//!
//! Running it again with the same version and guards changes nothing.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::storage::StorageError;
use crate::store::Storage;

/// Reserved key holding the guarded set
pub const GUARDED_KEY: &str = "guarded";

/// Reserved key holding the last reconciled version
pub const VERSION_KEY: &str = "version";

/// Separator between a key and its version suffix
pub const SEPARATOR: char = '_';

const RESERVED_KEYS: [&str; 2] = [GUARDED_KEY, VERSION_KEY];

/// Errors raised while constructing a version store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionStoreError {
    /// No version, or a blank one, was supplied
    #[error("A version store requires a non-empty version")]
    MissingVersion,
}

/// What reconciliation did to the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Records already matched; nothing was written
    Unchanged,
    /// New guarded keys were merged into the persisted set
    GuardsMerged { added: usize },
    /// Records were rewritten and unguarded keys deleted
    Purged { removed: usize },
}

/// Application-facing store that namespaces keys by version
#[derive(Debug)]
pub struct VersionStore {
    storage: Storage,
    version: String,
    guarded: Vec<String>,
    reconciliation: Reconciliation,
}

impl VersionStore {
    /// Create a store for `version`, reconciling the backing store first
    ///
    /// `guarded` lists keys that should never be suffixed, in addition to
    /// the reserved `guarded` and `version` keys.
    pub fn new<I, S>(storage: Storage, version: &str, guarded: I) -> Result<Self, VersionStoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if version.is_empty() {
            error!("VersionStore requires a version");
            return Err(VersionStoreError::MissingVersion);
        }

        let mut keys: Vec<String> = RESERVED_KEYS.iter().map(|k| k.to_string()).collect();
        for key in guarded {
            push_unique(&mut keys, key.into());
        }

        let mut store = Self {
            storage,
            version: version.to_string(),
            guarded: keys,
            reconciliation: Reconciliation::Unchanged,
        };
        store.reconciliation = store.reconcile();
        Ok(store)
    }

    /// The version this store namespaces keys with
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Keys stored without a version suffix, in persisted order
    pub fn guarded(&self) -> &[String] {
        &self.guarded
    }

    /// Outcome of the reconciliation run at construction
    pub fn reconciliation(&self) -> Reconciliation {
        self.reconciliation
    }

    /// The underlying shared storage handle
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn is_guarded(&self, key: &str) -> bool {
        self.guarded.iter().any(|g| g == key)
    }

    /// Map an application key to the key actually stored
    pub fn resolve_key(&self, key: &str) -> String {
        if self.is_guarded(key) {
            key.to_string()
        } else {
            format!("{}{}{}", key, SEPARATOR, self.version)
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let real_key = self.resolve_key(key);
        debug!("get {} -> {}", key, real_key);
        self.storage.get(&real_key)
    }

    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// Read `key` and decode it into `T`, `None` if absent or mistyped
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Store `value` under the resolved key, returning it
    ///
    /// Passing `None` removes the key.
    pub fn set<V: Into<Option<Value>>>(&self, key: &str, value: V) -> Option<Value> {
        let real_key = self.resolve_key(key);
        debug!("set {} -> {}", key, real_key);
        self.storage.set(&real_key, value.into())
    }

    /// Serialize `value` and store it under the resolved key
    pub fn set_as<T: Serialize>(&self, key: &str, value: &T) -> Option<Value> {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value),
            Err(source) => {
                let error = StorageError::Serialize {
                    key: key.to_string(),
                    source,
                };
                warn!("{}, nothing stored", error);
                None
            }
        }
    }

    /// Guard `key` from now on and store `value` under it verbatim
    ///
    /// The key is added to the persisted guarded set, so every later store
    /// keeps it across version changes.
    pub fn set_direct<V: Into<Option<Value>>>(&mut self, key: &str, value: V) -> Option<Value> {
        if self.storage.is_disabled() {
            return None;
        }
        {
            let _lock = self.storage.lock_bookkeeping();

            let persisted = self.read_guarded().unwrap_or_default();
            let mut merged = persisted.clone();
            for k in &self.guarded {
                push_unique(&mut merged, k.clone());
            }
            push_unique(&mut merged, key.to_string());

            if merged != persisted {
                self.storage
                    .set(GUARDED_KEY, Some(Value::from(merged.clone())));
            }
            self.guarded = merged;
        }

        info!("Registered guarded key '{}'", key);
        self.storage.set(key, value.into())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&self, key: &str) {
        let real_key = self.resolve_key(key);
        self.storage.remove(&real_key);
    }

    /// Wipe the whole backing store
    ///
    /// Guarded keys and the `version`/`guarded` records go too; the next
    /// store constructed treats the backend as uninitialized.
    pub fn clear(&self) {
        warn!("Clearing entire store, guarded keys included");
        self.storage.clear();
    }

    /// All stored entries under their raw keys, `None` if disabled
    pub fn get_all(&self) -> Option<BTreeMap<String, Value>> {
        self.storage.get_all()
    }

    /// Visit every raw key with its value
    pub fn for_each<F>(&self, visitor: F)
    where
        F: FnMut(&str, Option<Value>),
    {
        self.storage.for_each(visitor)
    }

    fn reconcile(&mut self) -> Reconciliation {
        let _lock = self.storage.lock_bookkeeping();

        let local_version = self.storage.get(VERSION_KEY);
        let local_guarded = self.read_guarded();

        let version_legal = local_version.as_ref().and_then(Value::as_str) == Some(self.version.as_str());
        let guarded_legal = local_guarded
            .as_ref()
            .is_some_and(|g| RESERVED_KEYS.iter().all(|r| g.iter().any(|k| k == r)));

        let persisted = if guarded_legal {
            local_guarded.unwrap_or_default()
        } else {
            Vec::new()
        };
        let mut merged = persisted.clone();
        for key in &self.guarded {
            push_unique(&mut merged, key.clone());
        }
        self.guarded = merged;

        if !(version_legal && guarded_legal) {
            self.storage
                .set(GUARDED_KEY, Some(Value::from(self.guarded.clone())));
            self.storage
                .set(VERSION_KEY, Some(Value::from(self.version.clone())));

            let stale: Vec<String> = self
                .storage
                .keys()
                .into_iter()
                .filter(|key| !self.is_guarded(key))
                .collect();
            for key in &stale {
                self.storage.remove(key);
            }
            // Removals that failed stay behind and are not counted
            let remaining = self
                .storage
                .keys()
                .into_iter()
                .filter(|key| stale.contains(key))
                .count();
            let removed = stale.len() - remaining;

            let previous = local_version.as_ref().and_then(Value::as_str);
            info!(
                "Reconciled store to version {} (was {:?}), removed {} unguarded keys",
                self.version, previous, removed
            );
            return Reconciliation::Purged { removed };
        }

        let added = self.guarded.len() - persisted.len();
        if added > 0 {
            self.storage
                .set(GUARDED_KEY, Some(Value::from(self.guarded.clone())));
            info!("Merged {} new guarded keys for version {}", added, self.version);
            return Reconciliation::GuardsMerged { added };
        }

        debug!("Store already reconciled for version {}", self.version);
        Reconciliation::Unchanged
    }

    /// Persisted guarded set, if it is a non-empty array of strings
    fn read_guarded(&self) -> Option<Vec<String>> {
        let value = self.storage.get(GUARDED_KEY)?;
        let keys: Vec<String> = serde_json::from_value(value).ok()?;
        if keys.is_empty() {
            return None;
        }
        let mut unique = Vec::with_capacity(keys.len());
        for key in keys {
            push_unique(&mut unique, key);
        }
        Some(unique)
    }
}

/// Append `key` unless already present; returns whether it was added
fn push_unique(keys: &mut Vec<String>, key: String) -> bool {
    if keys.contains(&key) {
        return false;
    }
    keys.push(key);
    true
}
