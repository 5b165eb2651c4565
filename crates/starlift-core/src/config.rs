//! Pipeline configuration, resolved from the environment once at startup.
//!
//! Every stage receives an explicit config struct; nothing else in the
//! crate reads process-wide environment state. Destination qualifiers are
//! validated here so a bad `PROJECT_ID`/`DATASET` fails immediately with
//! a named variable instead of producing a malformed table id at load
//! time.

use crate::error::{Error, Result};

/// Source warehouse credentials and session qualifiers.
#[derive(Debug, Clone)]
pub struct SnowflakeConfig {
    pub user: String,
    pub password: String,
    pub account: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
}

/// Destination project and dataset qualifiers.
#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    pub project_id: String,
    pub dataset: String,
    /// Pre-resolved OAuth bearer token. When absent the sink falls back
    /// to the metadata server at load time.
    pub access_token: Option<String>,
}

/// Full pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub snowflake: SnowflakeConfig,
    pub bigquery: BigQueryConfig,
}

fn require_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(Error::MissingEnv(name)),
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl SnowflakeConfig {
    /// Resolve from `SNOWFLAKE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingEnv`] naming the first unset variable.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            user: require_env("SNOWFLAKE_USER")?,
            password: require_env("SNOWFLAKE_PASSWORD")?,
            account: require_env("SNOWFLAKE_ACCOUNT")?,
            warehouse: require_env("SNOWFLAKE_WAREHOUSE")?,
            database: require_env("SNOWFLAKE_DATABASE")?,
            schema: require_env("SNOWFLAKE_SCHEMA")?,
        })
    }
}

impl BigQueryConfig {
    /// Resolve from `PROJECT_ID` and `DATASET`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingEnv`] for unset variables, or
    /// [`Error::InvalidConfig`] if a qualifier would corrupt the
    /// `project.dataset.table` identifier.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            project_id: require_env("PROJECT_ID")?,
            dataset: require_env("DATASET")?,
            access_token: optional_env("GOOGLE_OAUTH_ACCESS_TOKEN"),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [("PROJECT_ID", &self.project_id), ("DATASET", &self.dataset)] {
            if value.contains('.') || value.chars().any(char::is_whitespace) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must not contain dots or whitespace, got '{value}'"
                )));
            }
        }
        Ok(())
    }

    /// Fully-qualified destination identifier for one analytics table.
    pub fn table_id(&self, table: &str) -> String {
        format!("{}.{}.{}", self.project_id, self.dataset, table)
    }
}

impl Config {
    /// Resolve the whole pipeline configuration.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error encountered; the error names
    /// the offending environment variable.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            snowflake: SnowflakeConfig::from_env()?,
            bigquery: BigQueryConfig::from_env()?,
        })
    }
}
