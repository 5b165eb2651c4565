//! Batch ETL for retail transactions: Snowflake → star schema → BigQuery.
//!
//! One invocation runs a strictly sequential pipeline:
//!
//! 1. **Extract** — pull every row of the raw online-retail table from
//!    Snowflake into an in-memory Arrow batch ([`snowflake`]).
//! 2. **Transform** — derive two fact tables and three dimension tables
//!    from the raw rows ([`transform`]).
//! 3. **Load** — overwrite the corresponding BigQuery tables, one
//!    write-truncate load job each ([`bigquery`]).
//!
//! The source and destination sit behind the [`source::Source`] and
//! [`sink::TableSink`] traits so the pipeline can be exercised without
//! either warehouse.

pub mod bigquery;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod sink;
pub mod snowflake;
pub mod source;
pub mod table;
pub mod transform;

pub use error::{Error, Result};
