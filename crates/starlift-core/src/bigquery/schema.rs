//! Arrow schema → BigQuery load-job schema mapping.

use arrow::datatypes::{DataType, Schema, TimeUnit};
use serde_json::{json, Value};

use crate::error::{Error, Result};

fn bigquery_type(data_type: &DataType) -> Result<&'static str> {
    match data_type {
        DataType::Utf8 => Ok("STRING"),
        DataType::Int32 | DataType::Int64 => Ok("INTEGER"),
        DataType::Float64 => Ok("FLOAT"),
        DataType::Timestamp(TimeUnit::Microsecond, None) => Ok("DATETIME"),
        DataType::Date32 => Ok("DATE"),
        other => Err(Error::Schema(format!(
            "no BigQuery mapping for Arrow type {other}"
        ))),
    }
}

/// Field list for the load job's explicit schema.
pub(super) fn bigquery_fields(schema: &Schema) -> Result<Vec<Value>> {
    schema
        .fields()
        .iter()
        .map(|field| {
            Ok(json!({
                "name": field.name(),
                "type": bigquery_type(field.data_type())?,
                "mode": if field.is_nullable() { "NULLABLE" } else { "REQUIRED" },
            }))
        })
        .collect()
}
