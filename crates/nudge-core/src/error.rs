//! Core error types for nudge-core.
//!
//! Errors are grouped by the collaborator that produced them so callers can
//! decide how much of an operation is lost: a store failure loses one event,
//! a notifier failure loses one reminder, and configuration problems never
//! surface at all because defaults are substituted.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for nudge-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// State store errors
    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// State store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The durable store could not be opened
    #[error("State store unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("State store migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked by another writer
    #[error("State store is locked")]
    Locked,

    /// A previous holder of the store lock panicked
    #[error("State store lock poisoned")]
    Poisoned,
}

/// Errors reported by a [`Notifier`](crate::notifier::Notifier).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifierError {
    /// Rendering failed for one conversation
    #[error("Failed to render notification for '{token}': {message}")]
    RenderFailed { token: String, message: String },

    /// The rendering backend is not available at all
    #[error("Notifier unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Data directory could not be determined or created
    #[error("Data directory error: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked
                    || err.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_busy_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(StoreError::from(err), StoreError::Locked));
    }

    #[test]
    fn other_sqlite_errors_map_to_query_failed() {
        let err = rusqlite::Error::QueryReturnedNoRows;
        assert!(matches!(StoreError::from(err), StoreError::QueryFailed(_)));
    }

    #[test]
    fn store_error_wraps_into_core_error() {
        let err: CoreError = StoreError::Locked.into();
        assert_eq!(err.to_string(), "State store error: State store is locked");
    }

    #[test]
    fn config_error_wraps_into_core_error() {
        let err: CoreError = ConfigError::DataDir("no home directory".into()).into();
        assert!(matches!(err, CoreError::Config(ConfigError::DataDir(_))));
    }
}
