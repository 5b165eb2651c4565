//! BigQuery destination: one write-truncate load job per table.
//!
//! Each load submits a multipart media upload — job configuration plus
//! the batch rendered as newline-delimited JSON — then polls the job
//! until it reports `DONE`. Loads are destructive (`WRITE_TRUNCATE`) and
//! independent: a failed table does not roll back siblings that already
//! completed.

mod schema;

use std::time::Duration;

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::BigQueryConfig;
use crate::error::{Error, Result};
use crate::sink::TableSink;
use crate::table::batch_to_ndjson;

const UPLOAD_BASE: &str = "https://bigquery.googleapis.com/upload/bigquery/v2/projects";
const JOBS_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2/projects";

/// Metadata-server token endpoint, the thin ADC path for workloads
/// running on Google infrastructure. Used when the config carries no
/// pre-resolved token.
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

const MULTIPART_BOUNDARY: &str = "starlift_load_boundary";
const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct BigQuerySink {
    client: Client,
    project_id: String,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    job_reference: JobReference,
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    state: String,
    error_result: Option<JobError>,
}

#[derive(Debug, Deserialize)]
struct JobError {
    message: String,
}

/// Split `project.dataset.table` into its three parts.
fn split_table_id(table_id: &str) -> Result<(&str, &str, &str)> {
    let mut parts = table_id.splitn(3, '.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(project), Some(dataset), Some(table))
            if !project.is_empty() && !dataset.is_empty() && !table.is_empty() =>
        {
            Ok((project, dataset, table))
        }
        _ => Err(Error::Load {
            table_id: table_id.to_string(),
            message: "table id must have the form project.dataset.table".to_string(),
        }),
    }
}

/// Load-job configuration: overwrite the destination with NDJSON rows
/// under an explicit schema derived from the batch.
fn load_job_config(batch: &RecordBatch, project: &str, dataset: &str, table: &str) -> Result<Value> {
    Ok(json!({
        "configuration": {
            "load": {
                "destinationTable": {
                    "projectId": project,
                    "datasetId": dataset,
                    "tableId": table,
                },
                "writeDisposition": "WRITE_TRUNCATE",
                "sourceFormat": "NEWLINE_DELIMITED_JSON",
                "schema": { "fields": schema::bigquery_fields(batch.schema_ref())? },
            }
        }
    }))
}

/// Assemble the `multipart/related` upload body: job metadata part, then
/// the NDJSON media part.
fn multipart_body(job: &Value, ndjson: &str) -> String {
    format!(
        "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{job}\r\n\
         --{boundary}\r\nContent-Type: application/octet-stream\r\n\r\n{ndjson}\r\n\
         --{boundary}--\r\n",
        boundary = MULTIPART_BOUNDARY,
    )
}

impl BigQuerySink {
    pub fn new(config: &BigQueryConfig) -> Self {
        Self {
            client: Client::new(),
            project_id: config.project_id.clone(),
            access_token: config.access_token.clone(),
        }
    }

    async fn access_token(&self) -> Result<String> {
        if let Some(token) = &self.access_token {
            return Ok(token.clone());
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let response = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Auth(format!(
                "metadata server refused token request (HTTP {})",
                status.as_u16()
            )));
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn wait_for_job(&self, token: &str, job: &JobReference, table_id: &str) -> Result<()> {
        loop {
            let url = format!("{JOBS_BASE}/{}/jobs/{}", self.project_id, job.job_id);
            let mut request = self.client.get(&url).bearer_auth(token);
            if let Some(location) = &job.location {
                request = request.query(&[("location", location.as_str())]);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Api {
                    service: "bigquery",
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
            }

            let polled: Job = response.json().await?;
            if polled.status.state == "DONE" {
                return match polled.status.error_result {
                    None => Ok(()),
                    Some(err) => Err(Error::Load {
                        table_id: table_id.to_string(),
                        message: err.message,
                    }),
                };
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl TableSink for BigQuerySink {
    async fn load_table(&self, batch: &RecordBatch, table_id: &str) -> Result<u64> {
        let (project, dataset, table) = split_table_id(table_id)?;
        let job_config = load_job_config(batch, project, dataset, table)?;
        let ndjson = batch_to_ndjson(batch)?;
        let token = self.access_token().await?;

        let url = format!("{UPLOAD_BASE}/{}/jobs", self.project_id);
        let response = self
            .client
            .post(&url)
            .query(&[("uploadType", "multipart")])
            .bearer_auth(&token)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(multipart_body(&job_config, &ndjson))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Load {
                table_id: table_id.to_string(),
                message: format!(
                    "load job submission failed (HTTP {}): {}",
                    status.as_u16(),
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        let submitted: Job = response.json().await?;
        self.wait_for_job(&token, &submitted.job_reference, table_id)
            .await?;

        let rows = batch.num_rows() as u64;
        tracing::info!(table = table_id, rows, "load job complete");
        Ok(rows)
    }
}
