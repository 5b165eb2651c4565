//! Decoding of Snowflake JSON rowsets into Arrow batches.
//!
//! The query endpoint delivers every cell as a JSON scalar. The raw
//! extract keeps all of them as nullable text; typed coercion happens
//! later in [`crate::record`].

use arrow::record_batch::RecordBatch;
use serde_json::Value;

use crate::error::Result;
use crate::table::utf8_batch;

/// Render one rowset cell as text. JSON null maps to an Arrow null;
/// non-string scalars (the endpoint emits booleans and bare numbers for
/// some types) are stringified.
pub(super) fn cell_to_string(cell: &Value) -> Option<String> {
    match cell {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Materialize a rowset into an all-nullable-Utf8 batch with the
/// endpoint-reported column names.
pub(super) fn rowset_to_batch(columns: &[String], rowset: &[Vec<Value>]) -> Result<RecordBatch> {
    let rows: Vec<Vec<Option<String>>> = rowset
        .iter()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    utf8_batch(columns, &rows)
}
