//! BigQuery query service implementation.
//!
//! Provides the `BigQueryClient` struct that implements the `QueryService` trait
//! on top of the BigQuery v2 REST API (`jobs.query` + `jobs.getQueryResults`).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

use crate::config::WarehouseConfig;
use crate::error::{LeadStatusError, Result};
use crate::warehouse::auth::TokenProvider;
use crate::warehouse::{ColumnInfo, QueryRequest, QueryResult, QueryService, Row, Value};

/// BigQuery REST API base URL.
pub const DEFAULT_API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Default transport timeout for a single HTTP request, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default server-side wait per `jobs.query`/`getQueryResults` call, in milliseconds.
pub const DEFAULT_JOB_TIMEOUT_MS: u64 = 10_000;

/// BigQuery client options.
#[derive(Debug, Clone)]
pub struct BigQueryOptions {
    /// API base URL, overridable for testing.
    pub api_base: String,
    /// Dataset location (e.g. "US", "EU"), if not the project default.
    pub location: Option<String>,
    /// Transport timeout for each HTTP request.
    pub request_timeout: Duration,
    /// How long the service may hold each request open waiting for the job.
    pub job_timeout_ms: u64,
}

impl Default for BigQueryOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            location: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            job_timeout_ms: DEFAULT_JOB_TIMEOUT_MS,
        }
    }
}

impl BigQueryOptions {
    pub fn from_config(config: &WarehouseConfig) -> Self {
        Self {
            api_base: config.api_base.clone(),
            location: config.location.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            job_timeout_ms: config.job_timeout_ms,
        }
    }

    /// Sets the API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Sets the dataset location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// BigQuery query service client.
pub struct BigQueryClient {
    project: String,
    api_base: Url,
    tokens: Arc<dyn TokenProvider>,
    options: BigQueryOptions,
    http: Client,
}

impl std::fmt::Debug for BigQueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigQueryClient")
            .field("project", &self.project)
            .field("api_base", &self.api_base.as_str())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BigQueryClient {
    /// Creates a client that submits jobs to `project`.
    pub fn new(
        project: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        options: BigQueryOptions,
    ) -> Result<Self> {
        let api_base = Url::parse(&options.api_base).map_err(|e| {
            LeadStatusError::config(format!("Invalid API base URL '{}': {e}", options.api_base))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(LeadStatusError::config(format!(
                "Invalid API base URL '{}'",
                options.api_base
            )));
        }

        let http = Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| LeadStatusError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            project: project.into(),
            api_base,
            tokens,
            options,
            http,
        })
    }

    /// Builds `{api_base}/{segments...}`.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Sends a request and decodes a successful response body.
    async fn send(&self, builder: RequestBuilder) -> Result<QueryResponse> {
        let token = self.tokens.access_token().await?;
        let response = builder
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| LeadStatusError::remote(format!("Request to BigQuery failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LeadStatusError::remote(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(parse_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            LeadStatusError::internal(format!("Failed to parse BigQuery response: {e}"))
        })
    }

    /// Calls `jobs.getQueryResults` for a job, optionally for a later page.
    async fn get_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse> {
        let project = job.project_id.as_deref().unwrap_or(&self.project);
        let mut url = self.endpoint(&["projects", project, "queries", &job.job_id]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("timeoutMs", &self.options.job_timeout_ms.to_string());
            if let Some(location) = job.location.as_deref().or(self.options.location.as_deref()) {
                query.append_pair("location", location);
            }
            if let Some(page_token) = page_token {
                query.append_pair("pageToken", page_token);
            }
        }
        self.send(self.http.get(url)).await
    }
}

#[async_trait]
impl QueryService for BigQueryClient {
    async fn run_query(&self, request: &QueryRequest) -> Result<QueryResult> {
        let start = Instant::now();
        let body = QueryRequestBody::new(request, &self.options);
        let url = self.endpoint(&["projects", &self.project, "queries"]);

        debug!(
            "Submitting query job to project {} with {} parameters",
            self.project,
            request.params.len()
        );
        let mut response = self.send(self.http.post(url).json(&body)).await?;
        let job = response.job_reference.clone();

        // The service holds each call open for up to timeoutMs; keep asking until done.
        while !response.job_complete {
            let job = job.as_ref().ok_or_else(|| {
                LeadStatusError::internal("Incomplete job response without a jobReference")
            })?;
            debug!("Job {} still running, waiting for completion", job.job_id);
            response = self.get_results(job, None).await?;
        }

        if !response.errors.is_empty() {
            for error in &response.errors {
                warn!("BigQuery reported: {}", error.message);
            }
        }

        let fields = response
            .schema
            .as_ref()
            .map(|s| s.fields.clone())
            .unwrap_or_default();
        let columns: Vec<ColumnInfo> = fields
            .iter()
            .map(|f| ColumnInfo::new(&f.name, &f.field_type))
            .collect();
        let affected_rows = response
            .num_dml_affected_rows
            .as_deref()
            .and_then(|n| n.parse().ok());

        let mut rows = decode_rows(&fields, &response.rows)?;
        let mut page_token = response.page_token.take();

        while let Some(token) = page_token {
            let job = job.as_ref().ok_or_else(|| {
                LeadStatusError::internal("Paged response without a jobReference")
            })?;
            debug!("Fetching next result page for job {}", job.job_id);
            let page = self.get_results(job, Some(&token)).await?;
            rows.extend(decode_rows(&fields, &page.rows)?);
            page_token = page.page_token;
        }

        Ok(QueryResult {
            columns,
            rows,
            affected_rows,
            job_id: job.map(|j| j.job_id),
            execution_time: start.elapsed(),
        })
    }

    fn backend_name(&self) -> &'static str {
        "bigquery"
    }
}

/// Maps a non-2xx response to a remote error, keeping the service's own message.
fn parse_error(status: reqwest::StatusCode, body: &str) -> LeadStatusError {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(response) => LeadStatusError::remote(response.error.message),
        Err(_) => LeadStatusError::remote(format!("BigQuery API error ({status}): {body}")),
    }
}

fn decode_rows(fields: &[FieldSchema], rows: &[ApiRow]) -> Result<Vec<Row>> {
    rows.iter()
        .map(|row| {
            row.f
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let field_type = fields
                        .get(i)
                        .map(|f| f.field_type.as_str())
                        .unwrap_or("STRING");
                    decode_cell(field_type, &cell.v)
                })
                .collect::<Result<Row>>()
        })
        .collect()
}

/// Decodes one cell. Scalars arrive as JSON strings regardless of column type.
fn decode_cell(field_type: &str, raw: &serde_json::Value) -> Result<Value> {
    let text = match raw {
        serde_json::Value::Null => return Ok(Value::Null),
        serde_json::Value::String(s) => s.as_str(),
        other => return Ok(Value::String(other.to_string())),
    };

    let invalid = |e: &dyn std::fmt::Display| {
        LeadStatusError::internal(format!("Invalid {field_type} value '{text}': {e}"))
    };

    match field_type {
        "INTEGER" | "INT64" => text.parse().map(Value::Int).map_err(|e| invalid(&e)),
        "FLOAT" | "FLOAT64" => text.parse().map(Value::Float).map_err(|e| invalid(&e)),
        "BOOLEAN" | "BOOL" => text.parse().map(Value::Bool).map_err(|e| invalid(&e)),
        _ => Ok(Value::String(text.to_string())),
    }
}

// BigQuery API request/response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequestBody<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    parameter_mode: &'static str,
    query_parameters: Vec<ApiParameter<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    timeout_ms: u64,
}

impl<'a> QueryRequestBody<'a> {
    fn new(request: &'a QueryRequest, options: &'a BigQueryOptions) -> Self {
        Self {
            query: &request.sql,
            use_legacy_sql: false,
            parameter_mode: "NAMED",
            query_parameters: request
                .params
                .iter()
                .map(|p| ApiParameter {
                    name: &p.name,
                    parameter_type: ApiParameterType { param_type: "STRING" },
                    parameter_value: ApiParameterValue { value: &p.value },
                })
                .collect(),
            location: options.location.as_deref(),
            timeout_ms: options.job_timeout_ms,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiParameter<'a> {
    name: &'a str,
    parameter_type: ApiParameterType,
    parameter_value: ApiParameterValue<'a>,
}

#[derive(Debug, Serialize)]
struct ApiParameterType {
    #[serde(rename = "type")]
    param_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ApiParameterValue<'a> {
    value: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct QueryResponse {
    job_reference: Option<JobReference>,
    job_complete: bool,
    schema: Option<TableSchema>,
    rows: Vec<ApiRow>,
    page_token: Option<String>,
    num_dml_affected_rows: Option<String>,
    errors: Vec<ApiErrorProto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    #[serde(default)]
    project_id: Option<String>,
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Deserialize)]
struct FieldSchema {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
}

#[derive(Debug, Deserialize)]
struct ApiRow {
    #[serde(default)]
    f: Vec<ApiCell>,
}

#[derive(Debug, Deserialize)]
struct ApiCell {
    #[serde(default)]
    v: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiErrorProto {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}
