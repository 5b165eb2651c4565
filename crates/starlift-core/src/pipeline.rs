//! Sequential extract → transform → load orchestration.
//!
//! One pass, no retries, no parallel fan-out. The five table loads run
//! one after another; the first failure aborts the remaining loads but
//! leaves already-loaded tables in place (no cross-table transaction).

use std::time::Instant;

use crate::config::BigQueryConfig;
use crate::error::Result;
use crate::record::records_from_batch;
use crate::sink::TableSink;
use crate::source::Source;
use crate::transform::build_analytics_tables;

/// Row counts and timing for one completed run.
#[derive(Debug)]
pub struct PipelineReport {
    pub raw_rows: u64,
    /// (table name, rows written), in load order.
    pub loaded: Vec<(&'static str, u64)>,
    pub duration_secs: f64,
}

/// Run the full pipeline once.
///
/// # Errors
///
/// Propagates the first extraction, transform, or load error. Loads that
/// completed before the failure are not rolled back.
pub async fn run<S, K>(source: &S, sink: &K, destination: &BigQueryConfig) -> Result<PipelineReport>
where
    S: Source + Sync,
    K: TableSink + Sync,
{
    let started = Instant::now();

    tracing::info!("fetching raw data from source warehouse");
    let raw = source.fetch_raw().await?;
    let raw_rows = raw.num_rows() as u64;
    tracing::info!(rows = raw_rows, "raw table extracted");

    let records = records_from_batch(&raw)?;
    let tables = build_analytics_tables(&records)?;
    for (name, batch) in tables.iter() {
        tracing::info!(table = name, rows = batch.num_rows(), "derived table built");
    }

    let mut loaded = Vec::with_capacity(5);
    for (name, batch) in tables.iter() {
        let table_id = destination.table_id(name);
        tracing::info!(table = %table_id, rows = batch.num_rows(), "loading");
        let written = sink.load_table(batch, &table_id).await?;
        loaded.push((name, written));
    }

    Ok(PipelineReport {
        raw_rows,
        loaded,
        duration_secs: started.elapsed().as_secs_f64(),
    })
}
