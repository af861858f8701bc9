//! Configuration management for lead-status.
//!
//! Handles loading configuration from TOML files and environment variables:
//! which warehouse table to address and how to authenticate against it.

use crate::error::{LeadStatusError, Result};
use crate::warehouse::{
    TableRef, WarehouseBackend, DEFAULT_API_BASE, DEFAULT_JOB_TIMEOUT_MS,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project used by the memory backend when none is configured.
const MEMORY_PROJECT: &str = "memory";

/// Dataset used by the memory backend when none is configured.
const MEMORY_DATASET: &str = "local";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Warehouse location and client settings.
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// Credentials for the warehouse API.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Which table to address and how to talk to the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    #[serde(default)]
    pub backend: WarehouseBackend,

    /// Project that owns the dataset and is billed for jobs.
    pub project: Option<String>,

    /// Dataset holding the leads table.
    pub dataset: Option<String>,

    /// Leads table name. Defaults to `leads` when unset.
    pub table: Option<String>,

    /// Dataset location (e.g. "US").
    pub location: Option<String>,

    /// REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Transport timeout for each HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Server-side wait per request while a job runs.
    #[serde(default = "default_job_timeout_ms")]
    pub job_timeout_ms: u64,

    /// JSON file of leads to preload into the memory backend.
    pub seed: Option<PathBuf>,
}

const DEFAULT_TABLE: &str = "leads";

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_job_timeout_ms() -> u64 {
    DEFAULT_JOB_TIMEOUT_MS
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            backend: WarehouseBackend::default(),
            project: None,
            dataset: None,
            table: None,
            location: None,
            api_base: default_api_base(),
            request_timeout_secs: default_request_timeout_secs(),
            job_timeout_ms: default_job_timeout_ms(),
            seed: None,
        }
    }
}

impl WarehouseConfig {
    /// Returns the project, or an error naming how to set it.
    pub fn require_project(&self) -> Result<&str> {
        self.project.as_deref().ok_or_else(|| {
            LeadStatusError::config(
                "Project is required. Set [warehouse] project, BIGQUERY_PROJECT, or --project",
            )
        })
    }

    /// Resolves the fully-qualified leads table.
    ///
    /// The memory backend falls back to placeholder project/dataset names.
    pub fn table_ref(&self) -> Result<TableRef> {
        let (project, dataset) = match self.backend {
            WarehouseBackend::BigQuery => {
                let project = self.require_project()?;
                let dataset = self.dataset.as_deref().ok_or_else(|| {
                    LeadStatusError::config(
                        "Dataset is required. Set [warehouse] dataset, BIGQUERY_DATASET, or --dataset",
                    )
                })?;
                (project, dataset)
            }
            WarehouseBackend::Memory => (
                self.project.as_deref().unwrap_or(MEMORY_PROJECT),
                self.dataset.as_deref().unwrap_or(MEMORY_DATASET),
            ),
        };
        TableRef::new(project, dataset, self.table_name())
    }

    /// Configured table name, or the default.
    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(DEFAULT_TABLE)
    }

    /// Applies environment variables as defaults for unset fields.
    pub fn apply_env_defaults(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.project.is_none() {
            self.project = var("BIGQUERY_PROJECT");
        }
        if self.dataset.is_none() {
            self.dataset = var("BIGQUERY_DATASET");
        }
        if self.table.is_none() {
            self.table = var("BIGQUERY_TABLE");
        }
        if self.location.is_none() {
            self.location = var("BIGQUERY_LOCATION");
        }
    }

    /// Returns a display-safe description for logs.
    pub fn display_string(&self) -> String {
        let project = self.project.as_deref().unwrap_or("?");
        let dataset = self.dataset.as_deref().unwrap_or("?");
        format!(
            "{}.{}.{} ({})",
            project,
            dataset,
            self.table_name(),
            self.backend.as_str()
        )
    }
}

/// Credentials for the warehouse API.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Pre-issued OAuth access token (not recommended to store in config).
    pub access_token: Option<String>,

    /// Path to a service-account JSON key.
    pub credentials_file: Option<PathBuf>,
}

impl AuthConfig {
    /// Applies `BIGQUERY_ACCESS_TOKEN` and `GOOGLE_APPLICATION_CREDENTIALS` as defaults.
    pub fn apply_env_defaults(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.access_token.is_none() {
            self.access_token = var("BIGQUERY_ACCESS_TOKEN");
        }
        if self.credentials_file.is_none() {
            self.credentials_file = var("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from);
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lead-status")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| LeadStatusError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            LeadStatusError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Fills unset fields from the environment.
    pub fn apply_env_defaults(&mut self) {
        self.warehouse.apply_env_defaults();
        self.auth.apply_env_defaults();
    }
}
