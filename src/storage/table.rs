//! Incremental writer for the analytical store.
//!
//! Appends normalized batches to named tables, creating a table from the first
//! batch written to it. The table's column set is fixed from then on.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use duckdb::Connection;
use duckdb::types::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::ingest::{Cell, NormalizedRow};
use crate::storage::StorageError;

/// Every integer within ±2^53 converts to `f64` and back exactly.
const MAX_EXACT_DOUBLE_INT: u64 = 1 << 53;

fn fits_double(i: i64) -> bool {
    i.unsigned_abs() <= MAX_EXACT_DOUBLE_INT
}

/// Column types the writer creates and appends to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, Display)]
pub enum ColumnType {
    #[strum(to_string = "BOOLEAN", serialize = "BOOL")]
    Boolean,
    #[strum(to_string = "BIGINT", serialize = "INTEGER", serialize = "SMALLINT", serialize = "TINYINT")]
    BigInt,
    #[strum(to_string = "DOUBLE", serialize = "FLOAT", serialize = "REAL")]
    Double,
    #[strum(to_string = "VARCHAR", serialize = "TEXT", serialize = "STRING")]
    Varchar,
}

impl ColumnType {
    /// Narrowest type holding every non-null cell of a column.
    ///
    /// All-null or mixed text columns become `VARCHAR`. Ints mixed with
    /// floats become `DOUBLE` unless some int has no exact `f64` form.
    fn infer<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
        let (mut bools, mut ints, mut floats, mut texts) = (false, false, false, false);
        let mut wide_ints = false;
        for cell in cells {
            match cell {
                Cell::Null => {}
                Cell::Bool(_) => bools = true,
                Cell::Int(i) => {
                    ints = true;
                    wide_ints |= !fits_double(*i);
                }
                Cell::Float(_) => floats = true,
                Cell::Text(_) => texts = true,
            }
        }
        match (bools, ints, floats, texts) {
            (true, false, false, false) => Self::Boolean,
            (false, true, false, false) => Self::BigInt,
            (false, _, true, false) if !wide_ints => Self::Double,
            _ => Self::Varchar,
        }
    }

    /// Convert a cell for insertion into a column of this type.
    ///
    /// Only lossless conversions succeed; `None` means the value does not fit.
    /// An int goes into `DOUBLE` only within +/-2^53.
    fn coerce(self, cell: &Cell) -> Option<Value> {
        match (self, cell) {
            (_, Cell::Null) => Some(Value::Null),
            (Self::Varchar, c) => c.to_text().map(Value::Text),
            (Self::Boolean, Cell::Bool(b)) => Some(Value::Boolean(*b)),
            (Self::BigInt, Cell::Int(i)) => Some(Value::BigInt(*i)),
            (Self::BigInt, Cell::Float(f))
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
            {
                Some(Value::BigInt(*f as i64))
            }
            (Self::Double, Cell::Int(i)) if fits_double(*i) => Some(Value::Double(*i as f64)),
            (Self::Double, Cell::Float(f)) => Some(Value::Double(*f)),
            _ => None,
        }
    }
}

/// Appends normalized rows to tables in a DuckDB file.
///
/// Cheap to clone; clones share one connection. Writes are serialized.
#[derive(Clone)]
pub struct TableWriter {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for TableWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableWriter").finish_non_exhaustive()
    }
}

impl TableWriter {
    /// Open (or create) the store at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Internal(format!(
                    "Failed to create database directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// In-memory store, mostly for tests.
    pub fn in_memory() -> Result<Self, StorageError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Internal("table writer lock poisoned".to_string()))
    }

    /// Append `rows` to `table`, creating the table from this batch if needed.
    ///
    /// Returns the number of rows appended. An empty batch is a no-op and
    /// never creates a table. The batch's column set must equal the existing
    /// table's; otherwise nothing is written and [`StorageError::Schema`] is
    /// returned. Table creation and all inserts run in one transaction.
    pub fn write(&self, table: &str, rows: &[NormalizedRow]) -> Result<usize, StorageError> {
        let Some(first) = rows.first() else {
            tracing::debug!(table, "Empty batch, nothing to write");
            return Ok(0);
        };
        if table.is_empty() {
            return Err(StorageError::schema(table, "table name is empty"));
        }

        let batch_columns: Vec<String> = first.columns().map(str::to_string).collect();
        if batch_columns.is_empty() {
            return Err(StorageError::schema(table, "batch has no columns"));
        }
        if let Some(pos) = rows.iter().position(|r| !r.has_columns(&batch_columns)) {
            return Err(StorageError::schema(
                table,
                format!("row {pos} has a different column set than row 0"),
            ));
        }
        check_distinct_columns(table, &batch_columns)?;

        let mut conn = self.lock()?;
        let existing = table_schema(&conn, table)?;

        let (schema, create) = if existing.is_empty() {
            let schema: Vec<(String, ColumnType)> = batch_columns
                .iter()
                .map(|c| (c.clone(), ColumnType::infer(rows.iter().filter_map(|r| r.get(c)))))
                .collect();
            (schema, true)
        } else {
            check_columns(table, &existing, &batch_columns)?;
            (existing, false)
        };

        // Convert everything up front so a bad value aborts before any I/O.
        let mut values = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let mut row_values = Vec::with_capacity(schema.len());
            for (name, ty) in &schema {
                let cell = row.get(name).unwrap_or(&Cell::Null);
                let value = ty.coerce(cell).ok_or_else(|| {
                    StorageError::schema(
                        table,
                        format!("row {i}: value {cell:?} does not fit column '{name}' ({ty})"),
                    )
                })?;
                row_values.push(value);
            }
            values.push(row_values);
        }

        let tx = conn.transaction()?;
        if create {
            let defs = schema
                .iter()
                .map(|(name, ty)| format!("{} {}", quote_ident(name), ty))
                .collect::<Vec<_>>()
                .join(", ");
            tx.execute_batch(&format!("CREATE TABLE {} ({defs});", quote_ident(table)))?;
            tracing::info!(table, columns = schema.len(), "Created table from first batch");
        }
        {
            let names = schema
                .iter()
                .map(|(name, _)| quote_ident(name))
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = vec!["?"; schema.len()].join(", ");
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({names}) VALUES ({placeholders})",
                quote_ident(table)
            ))?;
            for row_values in values {
                stmt.execute(duckdb::params_from_iter(row_values))?;
            }
        }
        tx.commit()?;

        tracing::debug!(table, rows = rows.len(), "Batch appended");
        Ok(rows.len())
    }

    /// Whether `table` exists in the store. Names match case-insensitively.
    pub fn table_exists(&self, table: &str) -> Result<bool, StorageError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'main' AND lower(table_name) = lower(?)",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Column names and types of `table` in declaration order (empty if missing).
    pub fn columns(&self, table: &str) -> Result<Vec<(String, ColumnType)>, StorageError> {
        let conn = self.lock()?;
        table_schema(&conn, table)
    }

    /// Number of rows in `table` (0 if missing).
    pub fn row_count(&self, table: &str) -> Result<u64, StorageError> {
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// First `limit` rows of `table` in insertion order.
    pub fn preview(&self, table: &str, limit: usize) -> Result<Vec<NormalizedRow>, StorageError> {
        let schema = self.columns(table)?;
        if schema.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} LIMIT {limit}",
            quote_ident(table)
        ))?;
        let rows = stmt.query_map([], |row| {
            let mut cells = Vec::with_capacity(schema.len());
            for (i, (name, _)) in schema.iter().enumerate() {
                cells.push((name.clone(), cell_from_value(row.get::<_, Value>(i)?)));
            }
            Ok(cells.into_iter().collect::<NormalizedRow>())
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn table_schema(conn: &Connection, table: &str) -> Result<Vec<(String, ColumnType)>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT column_name, data_type FROM information_schema.columns
         WHERE table_schema = 'main' AND lower(table_name) = lower(?)
         ORDER BY ordinal_position",
    )?;
    let rows = stmt.query_map([table], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut schema = Vec::new();
    for row in rows {
        let (name, data_type) = row?;
        let ty = ColumnType::from_str(&data_type).map_err(|_| {
            StorageError::schema(table, format!("column '{name}' has unsupported type {data_type}"))
        })?;
        schema.push((name, ty));
    }
    Ok(schema)
}

/// DuckDB folds identifier case, so `a` and `A` would name the same column.
fn check_distinct_columns(table: &str, columns: &[String]) -> Result<(), StorageError> {
    let mut seen = std::collections::HashMap::with_capacity(columns.len());
    for column in columns {
        if let Some(prev) = seen.insert(column.to_lowercase(), column) {
            return Err(StorageError::schema(
                table,
                format!("columns '{prev}' and '{column}' differ only by case"),
            ));
        }
    }
    Ok(())
}

fn check_columns(
    table: &str,
    existing: &[(String, ColumnType)],
    batch: &[String],
) -> Result<(), StorageError> {
    let missing: Vec<&str> = existing
        .iter()
        .map(|(n, _)| n.as_str())
        .filter(|n| !batch.iter().any(|b| b == n))
        .collect();
    let unexpected: Vec<&str> = batch
        .iter()
        .map(String::as_str)
        .filter(|b| !existing.iter().any(|(n, _)| n == b))
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        return Ok(());
    }
    Err(StorageError::schema(
        table,
        format!("missing columns {missing:?}, unexpected columns {unexpected:?}"),
    ))
}

fn cell_from_value(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Boolean(b) => Cell::Bool(b),
        Value::TinyInt(i) => Cell::Int(i.into()),
        Value::SmallInt(i) => Cell::Int(i.into()),
        Value::Int(i) => Cell::Int(i.into()),
        Value::BigInt(i) => Cell::Int(i),
        Value::Float(f) => Cell::Float(f.into()),
        Value::Double(f) => Cell::Float(f),
        Value::Text(s) => Cell::Text(s),
        other => Cell::Text(format!("{other:?}")),
    }
}

/// Quote an SQL identifier, doubling embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
