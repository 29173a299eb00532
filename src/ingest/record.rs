//! Record types flowing through the ingest path.
//!
//! - [`RawRecord`]: one upstream item, shape varies per item
//! - [`Cell`] / [`NormalizedRow`]: flat, batch-uniform representation
//! - [`Watermark`]: fetch cursor

use std::collections::BTreeMap;

use serde_json::Value;

/// One record as returned by the source API.
///
/// Values are tagged (`null | bool | number | string | array | object`).
pub type RawRecord = serde_json::Map<String, Value>;

/// Default starting watermark for transaction backfills.
pub const DEFAULT_START_WATERMARK: &str = "1745634000.000000000";

/// Field used as the fetch cursor on transaction records.
pub const DEFAULT_CURSOR_FIELD: &str = "consensus_timestamp";

/// A flat value in a normalized row.
///
/// Nested structures never appear here; the normalizer turns them into `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text form used when the cell lands in a VARCHAR column.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

/// A record reshaped to the batch-wide key set.
///
/// Keys are kept sorted so every row of a batch iterates columns in the same order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedRow(BTreeMap<String, Cell>);

impl NormalizedRow {
    /// Column value, `None` if the column is not part of this row.
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.0.get(column)
    }

    /// Column names in sorted order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this row has exactly the given (sorted) columns.
    pub fn has_columns(&self, columns: &[String]) -> bool {
        self.0.len() == columns.len() && self.0.keys().zip(columns).all(|(a, b)| a == b)
    }
}

impl FromIterator<(String, Cell)> for NormalizedRow {
    fn from_iter<I: IntoIterator<Item = (String, Cell)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Cursor marking fetch progress; used as an exclusive lower bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Watermark(String);

impl Watermark {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Watermark after consuming `records`, taken from the last record's cursor field.
    ///
    /// Returns `self` unchanged if no record carries the field.
    pub fn advanced(&self, records: &[RawRecord], cursor_field: &str) -> Self {
        records
            .iter()
            .rev()
            .find_map(|r| match r.get(cursor_field) {
                Some(Value::String(s)) if !s.is_empty() => Some(Self(s.clone())),
                Some(Value::Number(n)) => Some(Self(n.to_string())),
                _ => None,
            })
            .unwrap_or_else(|| self.clone())
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self(DEFAULT_START_WATERMARK.to_string())
    }
}

impl std::fmt::Display for Watermark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Watermark {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> RawRecord {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_watermark_advances_to_last_record() {
        let start = Watermark::default();
        let records = vec![
            record(json!({"consensus_timestamp": "1745634000.000000001"})),
            record(json!({"consensus_timestamp": "1745634000.000000002"})),
        ];
        let next = start.advanced(&records, DEFAULT_CURSOR_FIELD);
        assert_eq!(next.as_str(), "1745634000.000000002");
    }

    #[test]
    fn test_watermark_unchanged_without_cursor() {
        let start = Watermark::new("100.0");
        assert_eq!(start.advanced(&[], DEFAULT_CURSOR_FIELD), start);

        let records = vec![record(json!({"other": 1}))];
        assert_eq!(start.advanced(&records, DEFAULT_CURSOR_FIELD), start);
    }

    #[test]
    fn test_cell_to_text() {
        assert_eq!(Cell::Null.to_text(), None);
        assert_eq!(Cell::Bool(true).to_text().as_deref(), Some("true"));
        assert_eq!(Cell::Int(-3).to_text().as_deref(), Some("-3"));
        assert_eq!(Cell::Float(0.5).to_text().as_deref(), Some("0.5"));
    }

    #[test]
    fn test_has_columns() {
        let row: NormalizedRow = [
            ("a".to_string(), Cell::Int(1)),
            ("b".to_string(), Cell::Null),
        ]
        .into_iter()
        .collect();
        assert!(row.has_columns(&["a".to_string(), "b".to_string()]));
        assert!(!row.has_columns(&["a".to_string()]));
        assert!(!row.has_columns(&["a".to_string(), "c".to_string()]));
    }
}
