//! Fact table construction: sales and returns batches.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::record::RawRecord;

/// Dedup key over the full raw tuple, not just the projected columns:
/// dedup runs before description is projected away, so two rows differing
/// only in description both survive. Prices are keyed by bit pattern;
/// equal source text always yields equal bits.
type RowKey = (
    Option<String>,
    Option<i64>,
    Option<String>,
    Option<String>,
    Option<i64>,
    Option<u64>,
    Option<i64>,
    Option<String>,
);

fn row_key(record: &RawRecord) -> RowKey {
    (
        record.invoice_no.clone(),
        record.invoice_date.map(|ts| ts.and_utc().timestamp_micros()),
        record.stock_code.clone(),
        record.description.clone(),
        record.quantity,
        record.unit_price.map(f64::to_bits),
        record.customer_id,
        record.country.clone(),
    )
}

/// Drop rows without a customer id and deduplicate on the full raw tuple,
/// preserving first-seen order.
pub(super) fn dedup_with_customer<'a>(
    records: impl IntoIterator<Item = &'a RawRecord>,
) -> Vec<&'a RawRecord> {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    for record in records {
        if record.customer_id.is_none() {
            continue;
        }
        if seen.insert(row_key(record)) {
            kept.push(record);
        }
    }
    kept
}

fn fact_schema(value_column: &str) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("invoice_no", DataType::Utf8, true),
        Field::new(
            "invoice_date",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new("customer_id", DataType::Int64, false),
        Field::new("stock_code", DataType::Utf8, true),
        Field::new("quantity", DataType::Int64, true),
        Field::new("unit_price", DataType::Float64, true),
        Field::new(value_column, DataType::Float64, true),
        Field::new("country", DataType::Utf8, true),
    ]))
}

fn fact_batch(
    rows: &[&RawRecord],
    value_column: &str,
    value: Vec<Option<f64>>,
) -> Result<RecordBatch> {
    let invoices: StringArray = rows.iter().map(|r| r.invoice_no.clone()).collect();
    let dates: TimestampMicrosecondArray = rows
        .iter()
        .map(|r| r.invoice_date.map(|ts| ts.and_utc().timestamp_micros()))
        .collect();
    let customers: Int64Array = rows.iter().map(|r| r.customer_id).collect();
    let stock_codes: StringArray = rows.iter().map(|r| r.stock_code.clone()).collect();
    let quantities: Int64Array = rows.iter().map(|r| r.quantity).collect();
    let prices: Float64Array = rows.iter().map(|r| r.unit_price).collect();
    let values = Float64Array::from(value);
    let countries: StringArray = rows.iter().map(|r| r.country.clone()).collect();

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(invoices),
        Arc::new(dates),
        Arc::new(customers),
        Arc::new(stock_codes),
        Arc::new(quantities),
        Arc::new(prices),
        Arc::new(values),
        Arc::new(countries),
    ];
    Ok(RecordBatch::try_new(fact_schema(value_column), arrays)?)
}

/// `fact_sales`: total_price = quantity × unit_price.
pub(super) fn sales_batch(rows: &[&RawRecord]) -> Result<RecordBatch> {
    let totals = rows
        .iter()
        .map(|r| match (r.quantity, r.unit_price) {
            (Some(quantity), Some(price)) => Some(quantity as f64 * price),
            _ => None,
        })
        .collect();
    fact_batch(rows, "total_price", totals)
}

/// `fact_returns`: return_value = |quantity| × unit_price.
pub(super) fn returns_batch(rows: &[&RawRecord]) -> Result<RecordBatch> {
    let values = rows
        .iter()
        .map(|r| match (r.quantity, r.unit_price) {
            (Some(quantity), Some(price)) => Some(quantity.abs() as f64 * price),
            _ => None,
        })
        .collect();
    fact_batch(rows, "return_value", values)
}
