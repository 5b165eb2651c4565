use anyhow::{Context, Result};

use starlift_core::bigquery::BigQuerySink;
use starlift_core::config::Config;
use starlift_core::pipeline;
use starlift_core::snowflake::SnowflakeSource;

/// Execute the `run` command: resolve configuration, then extract,
/// transform, and load.
pub async fn execute() -> Result<()> {
    let config = Config::from_env().context("Failed to resolve pipeline configuration")?;

    tracing::info!(
        account = config.snowflake.account,
        database = config.snowflake.database,
        project = config.bigquery.project_id,
        dataset = config.bigquery.dataset,
        "starting ETL pipeline"
    );

    let source = SnowflakeSource::new(config.snowflake.clone());
    let sink = BigQuerySink::new(&config.bigquery);

    let report = pipeline::run(&source, &sink, &config.bigquery).await?;

    println!("ETL pipeline completed successfully.");
    println!("  Raw rows:       {}", report.raw_rows);
    for (name, rows) in &report.loaded {
        println!("  {:15} {} rows", format!("{name}:"), rows);
    }
    println!("  Duration:       {:.2}s", report.duration_secs);

    Ok(())
}
