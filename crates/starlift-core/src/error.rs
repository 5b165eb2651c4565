//! Error model for the ETL pipeline.
//!
//! Configuration and connectivity failures are fatal and propagate to the
//! process exit; data coercion failures never appear here — they degrade
//! to null values during [`crate::record`] parsing instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A required environment variable is unset or empty.
    #[error("missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Warehouse authentication was rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A vendor API call came back with a non-success status or payload.
    #[error("{service} API error (HTTP {status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// A destination table load failed. Loads already completed for
    /// sibling tables are not rolled back.
    #[error("load into {table_id} failed: {message}")]
    Load { table_id: String, message: String },

    /// Unexpected source schema (missing column, wrong column type).
    #[error("schema error: {0}")]
    Schema(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),
}

pub type Result<T> = std::result::Result<T, Error>;
