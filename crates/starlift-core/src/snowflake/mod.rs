//! Snowflake source connector over the REST session and query endpoints.
//!
//! Each call authenticates, runs one statement, and materializes the full
//! JSON rowset. Credentials come from [`SnowflakeConfig`]; warehouse,
//! database, and schema are bound at login. Connectivity failures are
//! fatal to the pipeline — there is no retry.

mod decode;

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::config::SnowflakeConfig;
use crate::error::{Error, Result};
use crate::source::Source;

const LOGIN_PATH: &str = "/session/v1/login-request";
const QUERY_PATH: &str = "/queries/v1/query-request";

/// Source table holding the denormalized invoice line items.
pub const RAW_TABLE: &str = "RAW_ONLINE_RETAIL";

pub struct SnowflakeSource {
    client: Client,
    config: SnowflakeConfig,
}

/// Envelope shared by the session and query endpoints.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ColumnInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    rowtype: Vec<ColumnInfo>,
    rowset: Vec<Vec<serde_json::Value>>,
}

impl SnowflakeSource {
    pub fn new(config: SnowflakeConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn base_url(&self) -> String {
        format!("https://{}.snowflakecomputing.com", self.config.account)
    }

    async fn login(&self) -> Result<String> {
        let url = format!("{}{}", self.base_url(), LOGIN_PATH);
        let body = json!({
            "data": {
                "LOGIN_NAME": self.config.user,
                "PASSWORD": self.config.password,
                "ACCOUNT_NAME": self.config.account,
                "CLIENT_APP_ID": "starlift",
                "CLIENT_APP_VERSION": env!("CARGO_PKG_VERSION"),
            }
        });

        let response = self
            .client
            .post(&url)
            .query(&[
                ("warehouse", self.config.warehouse.as_str()),
                ("databaseName", self.config.database.as_str()),
                ("schemaName", self.config.schema.as_str()),
            ])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                service: "snowflake",
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: ApiResponse<LoginData> = response.json().await?;
        match (parsed.success, parsed.data) {
            (true, Some(data)) => Ok(data.token),
            _ => Err(Error::Auth(
                parsed.message.unwrap_or_else(|| "login rejected".to_string()),
            )),
        }
    }

    async fn query(&self, token: &str, sql: &str) -> Result<QueryData> {
        let url = format!("{}{}", self.base_url(), QUERY_PATH);
        let response = self
            .client
            .post(&url)
            .query(&[("requestId", Uuid::new_v4().to_string())])
            .header("Authorization", format!("Snowflake Token=\"{token}\""))
            .json(&json!({ "sqlText": sql }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                service: "snowflake",
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: ApiResponse<QueryData> = response.json().await?;
        match (parsed.success, parsed.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(Error::Api {
                service: "snowflake",
                status: status.as_u16(),
                message: parsed.message.unwrap_or_else(|| "query rejected".to_string()),
            }),
        }
    }

    /// Run a statement expected to return a single scalar cell.
    async fn scalar(&self, sql: &str) -> Result<String> {
        let token = self.login().await?;
        let data = self.query(&token, sql).await?;
        data.rowset
            .first()
            .and_then(|row| row.first())
            .and_then(decode::cell_to_string)
            .ok_or_else(|| Error::Schema(format!("no scalar result for: {sql}")))
    }

    /// Server version, for the connectivity check.
    pub async fn server_version(&self) -> Result<String> {
        self.scalar("SELECT CURRENT_VERSION()").await
    }

    /// First `limit` rows of the raw table, for the connectivity check.
    pub async fn sample_rows(&self, limit: u32) -> Result<RecordBatch> {
        let token = self.login().await?;
        let data = self
            .query(&token, &format!("SELECT * FROM {RAW_TABLE} LIMIT {limit}"))
            .await?;
        let columns: Vec<String> = data.rowtype.into_iter().map(|c| c.name).collect();
        decode::rowset_to_batch(&columns, &data.rowset)
    }

    /// Row count of the raw table, for the connectivity check.
    pub async fn table_row_count(&self) -> Result<u64> {
        let raw = self.scalar(&format!("SELECT COUNT(*) FROM {RAW_TABLE}")).await?;
        raw.parse()
            .map_err(|_| Error::Schema(format!("COUNT(*) returned non-numeric value: {raw}")))
    }
}

#[async_trait]
impl Source for SnowflakeSource {
    async fn fetch_raw(&self) -> Result<RecordBatch> {
        let token = self.login().await?;
        tracing::debug!(account = %self.config.account, "authenticated against Snowflake");

        let data = self.query(&token, &format!("SELECT * FROM {RAW_TABLE}")).await?;
        let columns: Vec<String> = data.rowtype.into_iter().map(|c| c.name).collect();
        decode::rowset_to_batch(&columns, &data.rowset)
    }
}
