//! Derivation of the five analytics tables from raw transaction records.
//!
//! Every step is a stateless projection: route rows into sales/returns/
//! dropped, filter and deduplicate the fact inputs, and take distinct
//! projections for the dimensions. Nothing here touches the network.

mod dims;
mod facts;
mod route;

use arrow::record_batch::RecordBatch;

pub use route::{classify, RowClass, CANCELLATION_MARKER};

use crate::error::Result;
use crate::record::RawRecord;

/// The five derived tables, in load order.
#[derive(Debug)]
pub struct AnalyticsTables {
    pub fact_sales: RecordBatch,
    pub fact_returns: RecordBatch,
    pub dim_products: RecordBatch,
    pub dim_customers: RecordBatch,
    pub dim_date: RecordBatch,
}

impl AnalyticsTables {
    /// Iterate (destination table name, batch) in load order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &RecordBatch)> {
        [
            ("fact_sales", &self.fact_sales),
            ("fact_returns", &self.fact_returns),
            ("dim_products", &self.dim_products),
            ("dim_customers", &self.dim_customers),
            ("dim_date", &self.dim_date),
        ]
        .into_iter()
    }
}

/// Build all five analytics tables from the coerced raw records.
///
/// Fact tables see only routed rows with a customer id, deduplicated on
/// the full raw tuple. Dimension tables are computed from the full record
/// set, before those filters.
pub fn build_analytics_tables(records: &[RawRecord]) -> Result<AnalyticsTables> {
    let mut sales = Vec::new();
    let mut returns = Vec::new();
    for record in records {
        match classify(record) {
            RowClass::Sale => sales.push(record),
            RowClass::Return => returns.push(record),
            RowClass::Dropped => {}
        }
    }

    let sales = facts::dedup_with_customer(sales);
    let returns = facts::dedup_with_customer(returns);

    Ok(AnalyticsTables {
        fact_sales: facts::sales_batch(&sales)?,
        fact_returns: facts::returns_batch(&returns)?,
        dim_products: dims::products_batch(records)?,
        dim_customers: dims::customers_batch(records)?,
        dim_date: dims::date_batch(records)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Date32Array, Float64Array, Int32Array, Int64Array, StringArray};
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(raw: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M").ok()
    }

    fn record(
        invoice: &str,
        quantity: i64,
        price: f64,
        customer: Option<i64>,
    ) -> RawRecord {
        RawRecord {
            invoice_no: Some(invoice.to_string()),
            stock_code: Some("85123A".to_string()),
            description: Some("WHITE HANGING HEART".to_string()),
            quantity: Some(quantity),
            invoice_date: ts("2010-12-01 08:26"),
            unit_price: Some(price),
            customer_id: customer,
            country: Some("United Kingdom".to_string()),
        }
    }

    fn f64_col<'a>(batch: &'a RecordBatch, name: &str) -> &'a Float64Array {
        let idx = batch.schema_ref().index_of(name).unwrap();
        batch.column(idx).as_any().downcast_ref().unwrap()
    }

    fn i32_col<'a>(batch: &'a RecordBatch, name: &str) -> &'a Int32Array {
        let idx = batch.schema_ref().index_of(name).unwrap();
        batch.column(idx).as_any().downcast_ref().unwrap()
    }

    // -----------------------------------------------------------------------
    // Routing
    // -----------------------------------------------------------------------

    #[test]
    fn test_cancellation_prefix_routes_to_returns() {
        assert_eq!(classify(&record("C536365", 6, 2.55, Some(1))), RowClass::Return);
        // cancellation wins even with positive quantity and price
        assert_eq!(classify(&record("C536366", 3, 1.0, Some(1))), RowClass::Return);
    }

    #[test]
    fn test_negative_quantity_routes_to_returns() {
        assert_eq!(classify(&record("536365", -6, 2.55, Some(1))), RowClass::Return);
    }

    #[test]
    fn test_valid_sale_routes_to_sales() {
        assert_eq!(classify(&record("536365", 6, 2.55, Some(1))), RowClass::Sale);
    }

    #[test]
    fn test_zero_price_positive_quantity_is_dropped() {
        // Not a cancellation, positive quantity, zero price: excluded from
        // both fact tables.
        assert_eq!(classify(&record("536365", 6, 0.0, Some(1))), RowClass::Dropped);
    }

    #[test]
    fn test_zero_quantity_is_dropped() {
        assert_eq!(classify(&record("536365", 0, 2.55, Some(1))), RowClass::Dropped);
    }

    #[test]
    fn test_null_fields_are_dropped_not_returned() {
        let mut r = record("536365", 6, 2.55, Some(1));
        r.quantity = None;
        assert_eq!(classify(&r), RowClass::Dropped);

        let mut r = record("536365", 6, 2.55, Some(1));
        r.unit_price = None;
        assert_eq!(classify(&r), RowClass::Dropped);

        // a null invoice fails the not-a-cancellation test too: the row
        // is neither a sale nor a return
        let mut r = record("536365", 6, 2.55, Some(1));
        r.invoice_no = None;
        assert_eq!(classify(&r), RowClass::Dropped);
    }

    #[test]
    fn test_null_invoice_row_excluded_from_both_facts() {
        let mut r = record("536365", 6, 2.55, Some(17850));
        r.invoice_no = None;
        let tables = build_analytics_tables(&[r]).unwrap();
        assert_eq!(tables.fact_sales.num_rows(), 0);
        assert_eq!(tables.fact_returns.num_rows(), 0);
        // dims still see the row
        assert_eq!(tables.dim_products.num_rows(), 1);
        assert_eq!(tables.dim_customers.num_rows(), 1);
    }

    // -----------------------------------------------------------------------
    // Fact tables
    // -----------------------------------------------------------------------

    #[test]
    fn test_sales_total_price() {
        let tables = build_analytics_tables(&[record("536365", 6, 2.55, Some(17850))]).unwrap();
        assert_eq!(tables.fact_sales.num_rows(), 1);
        let totals = f64_col(&tables.fact_sales, "total_price");
        assert!((totals.value(0) - 15.3).abs() < 1e-9);
    }

    #[test]
    fn test_return_value_is_absolute() {
        let tables = build_analytics_tables(&[record("536365", -6, 2.55, Some(17850))]).unwrap();
        assert_eq!(tables.fact_returns.num_rows(), 1);
        let values = f64_col(&tables.fact_returns, "return_value");
        assert!((values.value(0) - 15.3).abs() < 1e-9);
    }

    #[test]
    fn test_missing_customer_excluded_from_facts_only() {
        let tables = build_analytics_tables(&[
            record("536365", 6, 2.55, None),
            record("C536366", 1, 2.55, None),
        ])
        .unwrap();
        assert_eq!(tables.fact_sales.num_rows(), 0);
        assert_eq!(tables.fact_returns.num_rows(), 0);
        // the rows still feed products and dates
        assert_eq!(tables.dim_products.num_rows(), 1);
        assert_eq!(tables.dim_date.num_rows(), 1);
        // but not customers
        assert_eq!(tables.dim_customers.num_rows(), 0);
    }

    #[test]
    fn test_fact_customer_id_never_null() {
        let tables = build_analytics_tables(&[
            record("536365", 6, 2.55, Some(17850)),
            record("536367", 2, 1.25, None),
            record("536368", -2, 1.25, None),
        ])
        .unwrap();
        for batch in [&tables.fact_sales, &tables.fact_returns] {
            let idx = batch.schema_ref().index_of("customer_id").unwrap();
            assert_eq!(batch.column(idx).null_count(), 0);
        }
    }

    #[test]
    fn test_exact_duplicates_collapse() {
        let tables = build_analytics_tables(&[
            record("536365", 6, 2.55, Some(17850)),
            record("536365", 6, 2.55, Some(17850)),
        ])
        .unwrap();
        assert_eq!(tables.fact_sales.num_rows(), 1);
    }

    #[test]
    fn test_dedup_keys_on_full_raw_tuple() {
        // Rows identical except for description: both survive, because
        // dedup runs before description is projected away.
        let a = record("536365", 6, 2.55, Some(17850));
        let mut b = a.clone();
        b.description = Some("RED HANGING HEART".to_string());
        let tables = build_analytics_tables(&[a, b]).unwrap();
        assert_eq!(tables.fact_sales.num_rows(), 2);
    }

    // -----------------------------------------------------------------------
    // Dimension tables
    // -----------------------------------------------------------------------

    #[test]
    fn test_dim_products_distinct_no_nulls() {
        let mut no_description = record("536367", 2, 1.0, Some(1));
        no_description.description = None;
        no_description.stock_code = Some("22423".to_string());
        let tables = build_analytics_tables(&[
            record("536365", 6, 2.55, Some(17850)),
            record("536366", 4, 3.39, Some(17850)),
            no_description,
        ])
        .unwrap();
        // two identical (code, description) pairs collapse; the null row drops
        assert_eq!(tables.dim_products.num_rows(), 1);
        assert_eq!(tables.dim_products.column(0).null_count(), 0);
        assert_eq!(tables.dim_products.column(1).null_count(), 0);
    }

    #[test]
    fn test_dim_customers_keeps_null_country() {
        let mut no_country = record("536366", 1, 1.0, Some(12583));
        no_country.country = None;
        let tables = build_analytics_tables(&[
            record("536365", 6, 2.55, Some(17850)),
            no_country,
        ])
        .unwrap();
        assert_eq!(tables.dim_customers.num_rows(), 2);
        let countries = tables
            .dim_customers
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(countries.null_count(), 1);
    }

    #[test]
    fn test_dim_date_calendar_fields() {
        // 2010-12-06 is a Monday in ISO week 49; 2011-01-01 is a Saturday
        // that still belongs to ISO week 52 of 2010.
        let mut monday = record("536400", 1, 1.0, Some(1));
        monday.invoice_date = ts("2010-12-06 10:00");
        let mut new_year = record("540000", 1, 1.0, Some(1));
        new_year.invoice_date = ts("2011-01-01 12:30");

        let tables = build_analytics_tables(&[monday, new_year]).unwrap();
        assert_eq!(tables.dim_date.num_rows(), 2);

        let dates = tables
            .dim_date
            .column(0)
            .as_any()
            .downcast_ref::<Date32Array>()
            .unwrap();
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let monday_days =
            (NaiveDate::from_ymd_opt(2010, 12, 6).unwrap() - epoch).num_days() as i32;
        // sorted output: 2010-12-06 first
        assert_eq!(dates.value(0), monday_days);

        assert_eq!(i32_col(&tables.dim_date, "year").value(0), 2010);
        assert_eq!(i32_col(&tables.dim_date, "month").value(0), 12);
        assert_eq!(i32_col(&tables.dim_date, "day").value(0), 6);
        assert_eq!(i32_col(&tables.dim_date, "day_of_week").value(0), 1);
        assert_eq!(i32_col(&tables.dim_date, "week_of_year").value(0), 49);

        assert_eq!(i32_col(&tables.dim_date, "year").value(1), 2011);
        assert_eq!(i32_col(&tables.dim_date, "day_of_week").value(1), 6);
        assert_eq!(i32_col(&tables.dim_date, "week_of_year").value(1), 52);
    }

    #[test]
    fn test_dim_date_distinct_across_times() {
        let mut morning = record("536365", 1, 1.0, Some(1));
        morning.invoice_date = ts("2010-12-01 08:26");
        let mut evening = record("536999", 1, 1.0, Some(2));
        evening.invoice_date = ts("2010-12-01 19:45");
        let tables = build_analytics_tables(&[morning, evening]).unwrap();
        assert_eq!(tables.dim_date.num_rows(), 1);
    }

    #[test]
    fn test_unparseable_timestamp_yields_null_date_row() {
        let mut bad = record("536365", 6, 2.55, Some(17850));
        bad.invoice_date = None;
        let tables = build_analytics_tables(&[bad]).unwrap();
        assert_eq!(tables.dim_date.num_rows(), 1);
        assert_eq!(tables.dim_date.column(0).null_count(), 1);
        assert_eq!(tables.dim_date.column(1).null_count(), 1);
    }

    // -----------------------------------------------------------------------
    // Empty input
    // -----------------------------------------------------------------------

    #[test]
    fn test_empty_input_yields_five_empty_tables() {
        let tables = build_analytics_tables(&[]).unwrap();
        for (_, batch) in tables.iter() {
            assert_eq!(batch.num_rows(), 0);
        }
    }

    #[test]
    fn test_fact_column_layout() {
        let tables = build_analytics_tables(&[record("536365", 6, 2.55, Some(17850))]).unwrap();
        let names: Vec<&str> = tables
            .fact_sales
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(
            names,
            [
                "invoice_no",
                "invoice_date",
                "customer_id",
                "stock_code",
                "quantity",
                "unit_price",
                "total_price",
                "country"
            ]
        );
        let quantities = tables
            .fact_sales
            .column(4)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(quantities.value(0), 6);
    }
}
