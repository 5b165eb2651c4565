use anyhow::{Context, Result};

use starlift_core::config::{BigQueryConfig, SnowflakeConfig};
use starlift_core::snowflake::{SnowflakeSource, RAW_TABLE};
use starlift_core::table::format_preview;

const SAMPLE_ROWS: u32 = 5;

/// Execute the `check` command: validate configuration and source
/// warehouse connectivity without touching the destination tables.
pub async fn execute() -> Result<()> {
    let snowflake = SnowflakeConfig::from_env().context("Failed to resolve Snowflake configuration")?;
    println!("Source config:     OK");

    let bigquery = BigQueryConfig::from_env().context("Failed to resolve BigQuery configuration")?;
    println!(
        "Destination:       OK ({}.{})",
        bigquery.project_id, bigquery.dataset
    );

    let source = SnowflakeSource::new(snowflake);

    let version = source
        .server_version()
        .await
        .context("Snowflake connectivity check failed")?;
    println!("Connection:        OK (server version {version})");

    let rows = source.table_row_count().await?;
    println!("{:18} {} rows", format!("{RAW_TABLE}:"), rows);

    let sample = source.sample_rows(SAMPLE_ROWS).await?;
    println!("\nSample rows:");
    print!("{}", format_preview(&sample)?);

    println!("\nAll checks passed.");
    Ok(())
}
