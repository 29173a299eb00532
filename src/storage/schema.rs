//! Metrics store schema.

use duckdb::Connection;

use crate::storage::StorageError;

/// SQL statement for creating the metrics table.
///
/// Append-only time series; `timestamp` is stored as UTC microseconds.
pub const METRICS_TABLE_DDL: &str = r#"
CREATE SEQUENCE IF NOT EXISTS metrics_id_seq;
CREATE TABLE IF NOT EXISTS metrics (
    id          BIGINT PRIMARY KEY DEFAULT NEXTVAL('metrics_id_seq'),
    "timestamp" BIGINT NOT NULL,
    value       DOUBLE NOT NULL,
    source      VARCHAR NOT NULL
);
"#;

/// Initialize the metrics schema.
///
/// Creates the table and its id sequence if they don't exist.
pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(METRICS_TABLE_DDL)?;

    tracing::info!("Metrics schema initialized");
    Ok(())
}
