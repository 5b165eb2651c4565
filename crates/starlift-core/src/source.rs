//! Source seam: anything that can materialize the raw transactions table.

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;

use crate::error::Result;

/// A source warehouse. One operation: fetch every row of the raw table
/// into memory. All-or-nothing; there is no pagination or retry.
#[async_trait]
pub trait Source {
    async fn fetch_raw(&self) -> Result<RecordBatch>;
}
