//! Dimension table construction: products, customers, dates.
//!
//! Dimensions are distinct projections over the *full* record set, taken
//! before the fact-table customer filter. Output order is sorted, so the
//! derived batches are deterministic run to run.

use std::collections::BTreeSet;
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};

use crate::error::Result;
use crate::record::RawRecord;

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch date is always valid")
}

/// `dim_products`: distinct (stock_code, description), nulls dropped.
pub(super) fn products_batch(records: &[RawRecord]) -> Result<RecordBatch> {
    let mut distinct: BTreeSet<(&str, &str)> = BTreeSet::new();
    for record in records {
        if let (Some(code), Some(description)) =
            (record.stock_code.as_deref(), record.description.as_deref())
        {
            distinct.insert((code, description));
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("stock_code", DataType::Utf8, false),
        Field::new("description", DataType::Utf8, false),
    ]));
    let codes: StringArray = distinct.iter().map(|(code, _)| Some(*code)).collect();
    let descriptions: StringArray = distinct.iter().map(|(_, d)| Some(*d)).collect();
    let arrays: Vec<ArrayRef> = vec![Arc::new(codes), Arc::new(descriptions)];
    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// `dim_customers`: distinct (customer_id, country); rows without a
/// customer id are dropped, a null country is kept.
pub(super) fn customers_batch(records: &[RawRecord]) -> Result<RecordBatch> {
    let mut distinct: BTreeSet<(i64, Option<&str>)> = BTreeSet::new();
    for record in records {
        if let Some(id) = record.customer_id {
            distinct.insert((id, record.country.as_deref()));
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("customer_id", DataType::Int64, false),
        Field::new("country", DataType::Utf8, true),
    ]));
    let ids: Int64Array = distinct.iter().map(|(id, _)| Some(*id)).collect();
    let countries: StringArray = distinct.iter().map(|(_, country)| *country).collect();
    let arrays: Vec<ArrayRef> = vec![Arc::new(ids), Arc::new(countries)];
    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// `dim_date`: distinct calendar dates of the invoice timestamps with
/// derived calendar fields. Weekday is Monday=1..Sunday=7; week_of_year
/// is the ISO week number.
///
/// The distinct-date step has no null filter, so unparseable timestamps
/// contribute a single all-null row.
pub(super) fn date_batch(records: &[RawRecord]) -> Result<RecordBatch> {
    let mut distinct: BTreeSet<Option<NaiveDate>> = BTreeSet::new();
    for record in records {
        distinct.insert(record.invoice_date.map(|ts| ts.date()));
    }
    let dates: Vec<Option<NaiveDate>> = distinct.into_iter().collect();

    let epoch = epoch_date();
    let date_col: Date32Array = dates
        .iter()
        .map(|d| d.map(|d| (d - epoch).num_days() as i32))
        .collect();
    let years: Int32Array = dates.iter().map(|d| d.map(|d| d.year())).collect();
    let months: Int32Array = dates.iter().map(|d| d.map(|d| d.month() as i32)).collect();
    let days: Int32Array = dates.iter().map(|d| d.map(|d| d.day() as i32)).collect();
    let weekdays: Int32Array = dates
        .iter()
        .map(|d| d.map(|d| d.weekday().number_from_monday() as i32))
        .collect();
    let weeks: Int32Array = dates
        .iter()
        .map(|d| d.map(|d| d.iso_week().week() as i32))
        .collect();

    let schema = Arc::new(Schema::new(vec![
        Field::new("date", DataType::Date32, true),
        Field::new("year", DataType::Int32, true),
        Field::new("month", DataType::Int32, true),
        Field::new("day", DataType::Int32, true),
        Field::new("day_of_week", DataType::Int32, true),
        Field::new("week_of_year", DataType::Int32, true),
    ]));
    let arrays: Vec<ArrayRef> = vec![
        Arc::new(date_col),
        Arc::new(years),
        Arc::new(months),
        Arc::new(days),
        Arc::new(weekdays),
        Arc::new(weeks),
    ];
    Ok(RecordBatch::try_new(schema, arrays)?)
}
