//! Coercion of raw warehouse rows into typed records.
//!
//! The extractor materializes everything as nullable text; this module
//! turns each row into a [`RawRecord`] with typed optional fields. Any
//! cell that fails to coerce becomes `None` — coercion never aborts the
//! pipeline.

use arrow::array::{Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;

use crate::error::{Error, Result};

/// Invoice timestamp layout in the raw table, e.g. `12/1/10 8:26`.
pub const INVOICE_DATE_FORMAT: &str = "%m/%d/%y %H:%M";

/// One invoice line item, as extracted. Every field is optional: the
/// source table carries nulls and free-text cells that may not coerce.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub invoice_no: Option<String>,
    pub stock_code: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub invoice_date: Option<NaiveDateTime>,
    pub unit_price: Option<f64>,
    pub customer_id: Option<i64>,
    pub country: Option<String>,
}

/// Parse an integer cell. Warehouse exports sometimes carry integer ids
/// as floats (`17850.0`), so a zero-fraction float also coerces.
fn parse_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i64),
        _ => None,
    }
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse().ok()
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), INVOICE_DATE_FORMAT).ok()
}

fn utf8_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    let schema = batch.schema_ref();
    let idx = schema
        .fields()
        .iter()
        .position(|f| f.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::Schema(format!("source table has no column named {name}")))?;
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::Schema(format!("source column {name} is not a text column")))
}

/// Coerce a raw all-text batch into typed records.
///
/// Column lookup is case-insensitive (the warehouse reports uppercase
/// names). Description and country are whitespace-trimmed.
///
/// # Errors
///
/// Returns [`Error::Schema`] if an expected column is absent; cell-level
/// coercion failures yield `None` fields, never an error.
pub fn records_from_batch(batch: &RecordBatch) -> Result<Vec<RawRecord>> {
    let invoice_no = utf8_column(batch, "INVOICENO")?;
    let stock_code = utf8_column(batch, "STOCKCODE")?;
    let description = utf8_column(batch, "DESCRIPTION")?;
    let quantity = utf8_column(batch, "QUANTITY")?;
    let invoice_date = utf8_column(batch, "INVOICEDATE")?;
    let unit_price = utf8_column(batch, "UNITPRICE")?;
    let customer_id = utf8_column(batch, "CUSTOMERID")?;
    let country = utf8_column(batch, "COUNTRY")?;

    let cell = |arr: &StringArray, i: usize| -> Option<String> {
        if arr.is_null(i) {
            None
        } else {
            Some(arr.value(i).to_string())
        }
    };

    let mut records = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        records.push(RawRecord {
            invoice_no: cell(invoice_no, i),
            stock_code: cell(stock_code, i),
            description: cell(description, i).map(|s| s.trim().to_string()),
            quantity: cell(quantity, i).as_deref().and_then(parse_int),
            invoice_date: cell(invoice_date, i).as_deref().and_then(parse_timestamp),
            unit_price: cell(unit_price, i).as_deref().and_then(parse_float),
            customer_id: cell(customer_id, i).as_deref().and_then(parse_int),
            country: cell(country, i).map(|s| s.trim().to_string()),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::utf8_batch;
    use chrono::{NaiveDate, Timelike};

    fn raw_columns() -> Vec<String> {
        [
            "INVOICENO",
            "STOCKCODE",
            "DESCRIPTION",
            "QUANTITY",
            "INVOICEDATE",
            "UNITPRICE",
            "CUSTOMERID",
            "COUNTRY",
        ]
        .map(String::from)
        .to_vec()
    }

    fn cells(values: [Option<&str>; 8]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(String::from)).collect()
    }

    #[test]
    fn test_typed_coercion() {
        let batch = utf8_batch(
            &raw_columns(),
            &[cells([
                Some("536365"),
                Some("85123A"),
                Some("  WHITE HANGING HEART  "),
                Some("6"),
                Some("12/1/10 8:26"),
                Some("2.55"),
                Some("17850.0"),
                Some(" United Kingdom "),
            ])],
        )
        .unwrap();

        let records = records_from_batch(&batch).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.invoice_no.as_deref(), Some("536365"));
        assert_eq!(r.quantity, Some(6));
        assert_eq!(r.unit_price, Some(2.55));
        assert_eq!(r.customer_id, Some(17850));
        assert_eq!(r.description.as_deref(), Some("WHITE HANGING HEART"));
        assert_eq!(r.country.as_deref(), Some("United Kingdom"));

        let ts = r.invoice_date.unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2010, 12, 1).unwrap());
        assert_eq!((ts.hour(), ts.minute()), (8, 26));
    }

    #[test]
    fn test_bad_cells_degrade_to_null() {
        let batch = utf8_batch(
            &raw_columns(),
            &[cells([
                Some("536366"),
                Some("71053"),
                None,
                Some("six"),
                Some("2010-12-01 08:26"),
                Some("n/a"),
                Some("17850.5"),
                None,
            ])],
        )
        .unwrap();

        let r = &records_from_batch(&batch).unwrap()[0];
        assert_eq!(r.quantity, None);
        assert_eq!(r.invoice_date, None);
        assert_eq!(r.unit_price, None);
        // fractional customer id is not an integer id
        assert_eq!(r.customer_id, None);
        assert_eq!(r.description, None);
        assert_eq!(r.country, None);
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let columns: Vec<String> = raw_columns()
            .iter()
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let batch = utf8_batch(&columns, &[cells([None; 8])]).unwrap();
        assert_eq!(records_from_batch(&batch).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let batch = utf8_batch(&["INVOICENO".to_string()], &[]).unwrap();
        let err = records_from_batch(&batch).unwrap_err();
        assert!(err.to_string().contains("STOCKCODE"));
    }

    #[test]
    fn test_negative_quantity_parses() {
        assert_eq!(parse_int("-3"), Some(-3));
        assert_eq!(parse_int("-3.0"), Some(-3));
    }
}
