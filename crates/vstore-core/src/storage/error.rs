//! Storage error handling
//!
//! Provides typed errors for backing store operations with descriptive
//! messages and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during backing store operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create the directory holding the database
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Quota exceeded or disk full
    #[error("Storage quota exceeded while writing '{key}'. Free up space and try again.")]
    QuotaExceeded { key: String },

    /// The store failed its self-test and is running in no-op mode
    #[error("Storage is disabled: {reason}")]
    Disabled { reason: String },

    /// A value could not be serialized to JSON
    #[error("Failed to serialize value for '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Backend lock was poisoned by a panicking writer
    #[error("Backend lock poisoned")]
    Poisoned,
}

impl StorageError {
    /// Classify a SQLite error, surfacing full-disk conditions as quota errors
    pub fn from_sqlite(error: rusqlite::Error, key: &str) -> Self {
        match error {
            rusqlite::Error::SqliteFailure(ref e, _)
                if e.code == rusqlite::ErrorCode::DiskFull =>
            {
                StorageError::QuotaExceeded {
                    key: key.to_string(),
                }
            }
            other => StorageError::Database(other),
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::QuotaExceeded { .. } | StorageError::CreateDirectory { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::QuotaExceeded { .. } => {
                Some("Free up disk space or remove stale keys and try again.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StorageError::Disabled { .. } => {
                Some("Check that the database file is writable. All operations are no-ops until then.")
            }
            _ => None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_full_classification() {
        let sqlite_err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
            None,
        );
        let err = StorageError::from_sqlite(sqlite_err, "foo_1.0.0");

        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert!(err.is_recoverable());
        assert!(err.recovery_suggestion().is_some());
        assert!(err.to_string().contains("foo_1.0.0"));
    }

    #[test]
    fn test_other_sqlite_errors_pass_through() {
        let err = StorageError::from_sqlite(rusqlite::Error::QueryReturnedNoRows, "k");
        assert!(matches!(err, StorageError::Database(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_serialize_error_names_key() {
        let source = serde_json::to_value(std::collections::BTreeMap::from([(vec![1u8], 1u8)]))
            .unwrap_err();
        let err = StorageError::Serialize {
            key: "ids".to_string(),
            source,
        };

        assert!(err.to_string().contains("'ids'"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_disabled_display() {
        let err = StorageError::Disabled {
            reason: "sentinel mismatch".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("disabled"));
        assert!(msg.contains("sentinel mismatch"));
        assert!(err.recovery_suggestion().is_some());
    }
}
