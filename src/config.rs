//! Environment-sourced settings and the fixed parameters of an ingestion run.

use std::env;
use std::time::Duration;

use chrono::NaiveDate;

use crate::source::FetchQuery;
use crate::types::IngestError;

/// Default knowledge-base table when `KB_TABLE` is unset.
pub const DEFAULT_TABLE: &str = "regulations_kb";

/// Connection settings for the Postgres knowledge base.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    /// Target table, optionally schema-qualified (`schema.table`).
    pub table: String,
}

impl DatabaseConfig {
    /// Reads `DB_HOST`, `DB_NAME`, `DB_USER`, `DB_PASSWORD`, `DB_PORT`
    /// (default 5432) and `KB_TABLE` (default [`DEFAULT_TABLE`]).
    pub fn from_env() -> Result<Self, IngestError> {
        let port = match env::var("DB_PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| {
                IngestError::Config(format!("DB_PORT '{raw}' is not a valid port number"))
            })?,
            Err(_) => 5432,
        };
        Ok(Self {
            host: require_env("DB_HOST")?,
            port,
            name: require_env("DB_NAME")?,
            user: require_env("DB_USER")?,
            password: require_env("DB_PASSWORD")?,
            table: env::var("KB_TABLE").unwrap_or_else(|_| DEFAULT_TABLE.to_string()),
        })
    }
}

/// Everything the runner needs from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub openai_api_key: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, IngestError> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            openai_api_key: require_env("OPENAI_KEY")?,
        })
    }
}

/// Fixed parameters of one ingestion pass.
///
/// The defaults are the production values; tests and the runner override the
/// pieces they care about.
#[derive(Debug, Clone)]
pub struct RunParams {
    /// Lower bound (inclusive) on publication date.
    pub since: NaiveDate,
    /// Page size requested from the listing endpoint.
    pub per_page: u32,
    /// First page to request.
    pub start_page: u32,
    /// Free-text keywords, OR-ed together on the source side.
    pub keywords: Vec<String>,
    /// Document-type allow-list (empty = all types).
    pub allowed_types: Vec<String>,
    /// Pause between documents, keeping the embedding service rate limit.
    pub pause: Duration,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            since: NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid calendar date"),
            per_page: 500,
            start_page: 1,
            keywords: Vec::new(),
            allowed_types: vec!["RULE".to_string(), "PRORULE".to_string()],
            pause: Duration::from_millis(1200),
        }
    }
}

impl RunParams {
    /// The listing query corresponding to these parameters.
    pub fn fetch_query(&self) -> FetchQuery {
        FetchQuery {
            since: self.since,
            per_page: self.per_page,
            page: self.start_page,
            keywords: self.keywords.clone(),
            allowed_types: self.allowed_types.clone(),
        }
    }
}

fn require_env(key: &str) -> Result<String, IngestError> {
    env::var(key)
        .map_err(|_| IngestError::Config(format!("missing required environment variable {key}")))
}
