//! Destination seam: anything that can overwrite a table with a batch.

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;

use crate::error::Result;

/// A destination warehouse table writer.
#[async_trait]
pub trait TableSink {
    /// Overwrite the table at `table_id` (`project.dataset.table`) with
    /// the contents of `batch`, returning the number of rows written.
    ///
    /// Destructive: prior contents of the destination table are
    /// unconditionally discarded, even when `batch` is empty.
    async fn load_table(&self, batch: &RecordBatch, table_id: &str) -> Result<u64>;
}
