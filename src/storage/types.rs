use thiserror::Error;

use crate::feed::FeedItem;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while opening the SQLite database.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds a lock on the database
    #[error("Database is locked by another process. Close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_error(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) all surface
/// as one of these messages.
pub(crate) fn is_lock_error(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

/// Errors a [`DataStore`](super::DataStore) can report from `clear` or `set`.
///
/// Any of these aborts the refresh that triggered it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The SQLite backend rejected a statement
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A record could not be converted to or from its JSON form
    #[error("Invalid record data: {0}")]
    Serde(#[from] serde_json::Error),

    /// Backend-specific failure for stores without a richer error type
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// Records
// ============================================================================

/// A record read back from the SQLite store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem {
    pub guid: String,
    pub item: FeedItem,
    /// Unix timestamp of the last write
    pub stored_at: i64,
}
