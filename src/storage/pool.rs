//! Reader connections sharing the writer's database instance.

use std::sync::{Arc, Mutex};

use duckdb::Connection;

use crate::storage::StorageError;

/// Source of scoped read connections.
///
/// Each [`get`](Self::get) clones a fresh connection to the same DuckDB
/// instance the writer uses; dropping it releases the connection.
pub struct ReadPool {
    base: Mutex<Connection>,
}

impl ReadPool {
    /// Create a read pool from a connection to the writer's instance.
    pub fn new(conn: Connection) -> Arc<Self> {
        Arc::new(Self {
            base: Mutex::new(conn),
        })
    }

    /// Acquire a connection.
    pub fn get(&self) -> Result<Connection, StorageError> {
        let base = self
            .base
            .lock()
            .map_err(|_| StorageError::Internal("read pool lock poisoned".to_string()))?;
        Ok(base.try_clone()?)
    }
}
