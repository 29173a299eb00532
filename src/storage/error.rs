//! Storage-specific error types.
//!
//! All storage operations return [`StorageError`] on failure, which can be
//! matched to determine the underlying cause (database, channel, schema or internal).

use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database operation failed (DuckDB error).
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    /// Failed to send command to writer actor.
    #[error("failed to send command to writer actor")]
    ChannelSend,

    /// Writer actor stopped before acknowledging a command.
    #[error("writer actor closed before acknowledging")]
    ChannelClosed,

    /// Internal error (e.g., thread join or lock failure).
    #[error("internal error: {0}")]
    Internal(String),

    /// Batch does not fit the table's established schema.
    #[error("schema mismatch for table '{table}': {reason}")]
    Schema { table: String, reason: String },
}

impl StorageError {
    pub(crate) fn schema(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            reason: reason.into(),
        }
    }
}
