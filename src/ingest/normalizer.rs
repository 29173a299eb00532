//! Record normalization.
//!
//! Reconciles heterogeneous records into a uniform tabular shape: every row
//! gets the union of keys seen in the batch, nested values are serialized to
//! JSON text and missing keys become explicit nulls.

use std::collections::BTreeSet;

use serde_json::Value;

use super::record::{Cell, NormalizedRow, RawRecord};

/// Normalize a batch of raw records, preserving input order.
///
/// Empty input yields empty output.
pub fn normalize(records: &[RawRecord]) -> Vec<NormalizedRow> {
    let keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.keys().map(String::as_str))
        .collect();

    records
        .iter()
        .map(|record| {
            keys.iter()
                .map(|&key| {
                    let cell = record.get(key).map_or(Cell::Null, to_cell);
                    (key.to_string(), cell)
                })
                .collect()
        })
        .collect()
}

/// Sorted column set of a normalized batch (empty for an empty batch).
pub fn columns(rows: &[NormalizedRow]) -> Vec<String> {
    rows.first()
        .map(|row| row.columns().map(str::to_string).collect())
        .unwrap_or_default()
}

fn to_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Bool(b) => Cell::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Cell::Int(i)
            } else if n.is_u64() {
                // Above i64::MAX: keep the exact digits.
                Cell::Text(n.to_string())
            } else {
                n.as_f64().map_or(Cell::Null, Cell::Float)
            }
        }
        Value::String(s) => Cell::Text(s.clone()),
        // serde_json's Display is compact JSON; it parses back to the same structure.
        Value::Array(_) | Value::Object(_) => Cell::Text(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Vec<RawRecord> {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_normalize_empty() {
        assert!(normalize(&[]).is_empty());
        assert!(columns(&[]).is_empty());
    }

    #[test]
    fn test_rows_share_union_of_keys() {
        let input = records(vec![
            json!({"a": 1, "b": "x"}),
            json!({"b": "y", "c": true}),
            json!({}),
        ]);
        let rows = normalize(&input);

        assert_eq!(rows.len(), input.len());
        let expected = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        for row in &rows {
            assert!(row.has_columns(&expected));
        }
        assert_eq!(columns(&rows), expected);
    }

    #[test]
    fn test_missing_keys_are_null_and_order_preserved() {
        let input = records(vec![
            json!({"id": 1, "memo": "first"}),
            json!({"id": 2}),
            json!({"id": 3, "memo": "third"}),
        ]);
        let rows = normalize(&input);

        assert_eq!(rows[0].get("id"), Some(&Cell::Int(1)));
        assert_eq!(rows[1].get("id"), Some(&Cell::Int(2)));
        assert_eq!(rows[2].get("id"), Some(&Cell::Int(3)));
        assert_eq!(rows[1].get("memo"), Some(&Cell::Null));
        assert_eq!(rows[2].get("memo"), Some(&Cell::Text("third".to_string())));
    }

    #[test]
    fn test_nested_values_serialize_to_parseable_json() {
        let transfers = json!([{"account": "0.0.98", "amount": 1500}, {"account": "0.0.2", "amount": -1500}]);
        let nested = json!({"kind": "fee", "detail": {"x": [1, 2, null]}});
        let input = records(vec![json!({"transfers": transfers, "meta": nested})]);

        let rows = normalize(&input);
        let Some(Cell::Text(t)) = rows[0].get("transfers") else {
            panic!("expected text cell for nested list");
        };
        assert_eq!(serde_json::from_str::<Value>(t).unwrap(), transfers);

        let Some(Cell::Text(m)) = rows[0].get("meta") else {
            panic!("expected text cell for nested map");
        };
        assert_eq!(serde_json::from_str::<Value>(m).unwrap(), nested);
    }

    #[test]
    fn test_scalars_pass_through() {
        let input = records(vec![json!({
            "i": -7, "f": 2.5, "s": "0.0.1", "b": false, "n": null, "big": 18446744073709551615u64
        })]);
        let rows = normalize(&input);
        let row = &rows[0];

        assert_eq!(row.get("i"), Some(&Cell::Int(-7)));
        assert_eq!(row.get("f"), Some(&Cell::Float(2.5)));
        assert_eq!(row.get("s"), Some(&Cell::Text("0.0.1".to_string())));
        assert_eq!(row.get("b"), Some(&Cell::Bool(false)));
        assert_eq!(row.get("n"), Some(&Cell::Null));
        assert_eq!(
            row.get("big"),
            Some(&Cell::Text("18446744073709551615".to_string()))
        );
    }

    #[test]
    fn test_unsigned_beyond_i64_keeps_exact_digits() {
        let input = records(vec![
            json!({"supply": 9223372036854775808u64}),
            json!({"supply": 9223372036854775807i64}),
        ]);
        let rows = normalize(&input);

        let Some(Cell::Text(big)) = rows[0].get("supply") else {
            panic!("expected exact text for out-of-range integer");
        };
        assert_eq!(big.parse::<u64>().unwrap(), 9_223_372_036_854_775_808);
        assert_eq!(rows[1].get("supply"), Some(&Cell::Int(i64::MAX)));
    }
}
