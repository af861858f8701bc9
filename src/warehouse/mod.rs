//! Query service abstraction for lead-status.
//!
//! Provides a trait-based interface to the data warehouse, allowing the
//! BigQuery REST backend and the in-memory backend to be used interchangeably.

pub mod auth;
mod bigquery;
mod memory;
mod types;

pub use bigquery::{
    BigQueryClient, BigQueryOptions, DEFAULT_API_BASE, DEFAULT_JOB_TIMEOUT_MS,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use memory::MemoryWarehouse;
pub use types::{ColumnInfo, QueryParameter, QueryRequest, QueryResult, Row, Value};

use crate::config::Config;
use crate::error::{LeadStatusError, Result};
use async_trait::async_trait;
use std::fmt;

/// Supported warehouse backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseBackend {
    #[default]
    BigQuery,
    Memory,
}

impl WarehouseBackend {
    /// Returns the backend as a string for display and config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BigQuery => "bigquery",
            Self::Memory => "memory",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bigquery" | "bq" => Some(Self::BigQuery),
            "memory" | "mock" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Fully-qualified `<project>.<dataset>.<table>` identifier.
///
/// Identifiers cannot be bound as query parameters, so each part is checked
/// here before it is ever placed into statement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    project: String,
    dataset: String,
    table: String,
}

impl TableRef {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self> {
        let table_ref = Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        };
        for (kind, part) in [
            ("project", &table_ref.project),
            ("dataset", &table_ref.dataset),
            ("table", &table_ref.table),
        ] {
            validate_identifier(kind, part)?;
        }
        Ok(table_ref)
    }

    /// Returns the backtick-quoted identifier used in statement text.
    pub fn quoted(&self) -> String {
        format!("`{self}`")
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

fn validate_identifier(kind: &str, part: &str) -> Result<()> {
    if part.is_empty() {
        return Err(LeadStatusError::config(format!("{kind} name must not be empty")));
    }
    if let Some(bad) = part
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(LeadStatusError::config(format!(
            "Invalid character '{bad}' in {kind} name '{part}'"
        )));
    }
    Ok(())
}

/// Creates the query service selected by the configuration.
///
/// Called once at startup; the returned handle is shared for the life of the process.
pub async fn connect(config: &Config) -> Result<Box<dyn QueryService>> {
    match config.warehouse.backend {
        WarehouseBackend::BigQuery => {
            let project = config.warehouse.require_project()?;
            let tokens = auth::from_config(&config.auth)?;
            let options = BigQueryOptions::from_config(&config.warehouse);
            let client = BigQueryClient::new(project, tokens, options)?;
            Ok(Box::new(client))
        }
        WarehouseBackend::Memory => {
            let warehouse = match &config.warehouse.seed {
                Some(path) => MemoryWarehouse::from_seed_file(path)?,
                None => MemoryWarehouse::new(),
            };
            Ok(Box::new(warehouse))
        }
    }
}

/// Trait defining the interface to the external query service.
///
/// Each call submits one job and resolves once the job has completed.
/// Errors reported by the service come back as [`LeadStatusError::Remote`].
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Runs a parameterized statement and returns its full result.
    async fn run_query(&self, request: &QueryRequest) -> Result<QueryResult>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
