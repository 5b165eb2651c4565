//! Arrow batch helpers: raw table construction and NDJSON encoding.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Date32Array, Float64Array, Int32Array, Int64Array, StringArray,
    StringBuilder, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Duration, NaiveDate};
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch date is always valid")
}

/// Build an all-nullable-Utf8 batch from column names and string cells.
///
/// This is the shape of every raw extract: column names inferred from the
/// query result, every cell text or null.
///
/// # Errors
///
/// Returns [`Error::Schema`] on a ragged row.
pub fn utf8_batch(columns: &[String], rows: &[Vec<Option<String>>]) -> Result<RecordBatch> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|name| Field::new(name.as_str(), DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let mut builders: Vec<StringBuilder> = columns
        .iter()
        .map(|_| StringBuilder::with_capacity(rows.len(), rows.len() * 16))
        .collect();
    for row in rows {
        if row.len() != columns.len() {
            return Err(Error::Schema(format!(
                "ragged row: {} cells, expected {}",
                row.len(),
                columns.len()
            )));
        }
        for (builder, value) in builders.iter_mut().zip(row) {
            match value {
                Some(v) => builder.append_value(v),
                None => builder.append_null(),
            }
        }
    }

    let arrays: Vec<ArrayRef> = builders
        .into_iter()
        .map(|mut b| Arc::new(b.finish()) as ArrayRef)
        .collect();
    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// Pre-downcast column reference; resolves the concrete array type once
/// per column instead of per cell.
enum TypedCol<'a> {
    Utf8(&'a StringArray),
    Int32(&'a Int32Array),
    Int64(&'a Int64Array),
    Float64(&'a Float64Array),
    TimestampMicros(&'a TimestampMicrosecondArray),
    Date32(&'a Date32Array),
}

fn downcast_columns(batch: &RecordBatch) -> Result<Vec<TypedCol<'_>>> {
    batch
        .columns()
        .iter()
        .map(|col| match col.data_type() {
            DataType::Utf8 => Ok(TypedCol::Utf8(col.as_any().downcast_ref().unwrap())),
            DataType::Int32 => Ok(TypedCol::Int32(col.as_any().downcast_ref().unwrap())),
            DataType::Int64 => Ok(TypedCol::Int64(col.as_any().downcast_ref().unwrap())),
            DataType::Float64 => Ok(TypedCol::Float64(col.as_any().downcast_ref().unwrap())),
            DataType::Timestamp(TimeUnit::Microsecond, None) => Ok(TypedCol::TimestampMicros(
                col.as_any().downcast_ref().unwrap(),
            )),
            DataType::Date32 => Ok(TypedCol::Date32(col.as_any().downcast_ref().unwrap())),
            other => Err(Error::Schema(format!(
                "unsupported column type for load: {other}"
            ))),
        })
        .collect()
}

/// JSON value for one cell, `None` when the cell is null.
///
/// Timestamps render as `YYYY-MM-DD HH:MM:SS` and dates as `YYYY-MM-DD`,
/// the lexical forms BigQuery accepts for DATETIME and DATE.
fn json_value(col: &TypedCol<'_>, row: usize) -> Option<Value> {
    match col {
        TypedCol::Utf8(arr) => {
            if arr.is_null(row) {
                return None;
            }
            Some(Value::String(arr.value(row).to_string()))
        }
        TypedCol::Int32(arr) => {
            if arr.is_null(row) {
                return None;
            }
            Some(Value::Number(Number::from(arr.value(row))))
        }
        TypedCol::Int64(arr) => {
            if arr.is_null(row) {
                return None;
            }
            Some(Value::Number(Number::from(arr.value(row))))
        }
        TypedCol::Float64(arr) => {
            if arr.is_null(row) {
                return None;
            }
            Number::from_f64(arr.value(row)).map(Value::Number)
        }
        TypedCol::TimestampMicros(arr) => {
            if arr.is_null(row) {
                return None;
            }
            DateTime::from_timestamp_micros(arr.value(row))
                .map(|ts| Value::String(ts.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string()))
        }
        TypedCol::Date32(arr) => {
            if arr.is_null(row) {
                return None;
            }
            let date = epoch_date() + Duration::days(i64::from(arr.value(row)));
            Some(Value::String(date.format("%Y-%m-%d").to_string()))
        }
    }
}

/// Encode a batch as newline-delimited JSON, one object per row.
///
/// Null cells are omitted from the row object; BigQuery treats an absent
/// key as NULL.
///
/// # Errors
///
/// Returns [`Error::Schema`] on a column type with no JSON rendering.
pub fn batch_to_ndjson(batch: &RecordBatch) -> Result<String> {
    let cols = downcast_columns(batch)?;
    let schema = batch.schema();

    let mut out = String::new();
    for row in 0..batch.num_rows() {
        let mut object = Map::new();
        for (field, col) in schema.fields().iter().zip(&cols) {
            if let Some(value) = json_value(col, row) {
                object.insert(field.name().clone(), value);
            }
        }
        out.push_str(&Value::Object(object).to_string());
        out.push('\n');
    }
    Ok(out)
}

/// Plain-text preview of a batch: a header line, then one line per row
/// with `|`-separated cells. Nulls render as empty cells.
///
/// # Errors
///
/// Returns [`Error::Schema`] on a column type with no text rendering.
pub fn format_preview(batch: &RecordBatch) -> Result<String> {
    let cols = downcast_columns(batch)?;
    let schema = batch.schema();

    let header: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    let mut out = header.join(" | ");
    out.push('\n');
    for row in 0..batch.num_rows() {
        let cells: Vec<String> = cols
            .iter()
            .map(|col| match json_value(col, row) {
                Some(Value::String(s)) => s,
                Some(value) => value.to_string(),
                None => String::new(),
            })
            .collect();
        out.push_str(&cells.join(" | "));
        out.push('\n');
    }
    Ok(out)
}
