//! Reads and writes the `email_status` column of the leads table.
//!
//! Every operation is one request/response round trip through the shared
//! [`QueryService`] handle. Input is validated before anything is submitted,
//! and errors from the service are returned as-is.

use tracing::{debug, info, warn};

use crate::error::{LeadStatusError, Result};
use crate::leads::{LeadRecord, StatusCount, StatusUpdate};
use crate::statements::LeadStatements;
use crate::status::EmailStatus;
use crate::warehouse::{QueryRequest, QueryResult, QueryService, Row, TableRef, Value};

/// Updates and reports lead email statuses.
pub struct StatusUpdater<'a> {
    service: &'a dyn QueryService,
    statements: LeadStatements,
}

impl<'a> StatusUpdater<'a> {
    /// Creates an updater for `table` using the process-wide service handle.
    pub fn new(service: &'a dyn QueryService, table: TableRef) -> Self {
        Self {
            service,
            statements: LeadStatements::new(table),
        }
    }

    pub fn table(&self) -> &TableRef {
        self.statements.table()
    }

    /// Sets the status of the lead(s) whose normalized email matches `email`.
    pub async fn update_one(&self, email: &str, status: &str) -> Result<()> {
        let status = EmailStatus::parse(status)?;
        let request = self.statements.update_one(email, status);

        let result = self.run(&request).await?;
        info!(
            "Updated email status for {} to {}{}",
            email,
            status,
            affected_suffix(&result)
        );
        Ok(())
    }

    /// Applies a batch of updates in a single statement.
    ///
    /// The whole batch is validated first: an empty batch or any unknown
    /// status fails without submitting anything.
    pub async fn update_many(&self, pairs: &[StatusUpdate]) -> Result<()> {
        let validated = validate_batch(pairs)?;
        let request = self.statements.update_many(&validated);

        let result = self.run(&request).await?;
        info!(
            "Bulk updated {} email statuses{}",
            validated.len(),
            affected_suffix(&result)
        );
        Ok(())
    }

    /// Looks up one lead by normalized email. No match is `Ok(None)`.
    pub async fn get_one(&self, email: &str) -> Result<Option<LeadRecord>> {
        let result = self.run(&self.statements.get_one(email)).await?;

        let Some(row) = result.rows.first() else {
            debug!("No lead found for {}", email);
            return Ok(None);
        };

        let record = LeadRecord {
            email: required_string(&result, row, "email")?,
            email_status: optional_string(&result, row, "email_status"),
            tracking_id: optional_string(&result, row, "trackingId"),
        };

        if let (Some(raw), None) = (&record.email_status, record.status()) {
            warn!("Lead {} has unrecognized email_status '{}'", record.email, raw);
        }

        Ok(Some(record))
    }

    /// Number of leads per distinct status, largest first.
    pub async fn status_counts(&self) -> Result<Vec<StatusCount>> {
        let result = self.run(&self.statements.status_counts()).await?;

        result
            .rows
            .iter()
            .map(|row| -> Result<StatusCount> {
                let count = result
                    .value(row, "count")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| LeadStatusError::internal("Missing or invalid count column"))?;
                Ok(StatusCount {
                    email_status: optional_string(&result, row, "email_status"),
                    count,
                })
            })
            .collect()
    }

    async fn run(&self, request: &QueryRequest) -> Result<QueryResult> {
        let result = self.service.run_query(request).await?;
        debug!(
            "{} job {} finished in {:?}",
            self.service.backend_name(),
            result.job_id.as_deref().unwrap_or("-"),
            result.execution_time
        );
        Ok(result)
    }
}

/// Checks every pair before any of them is sent.
fn validate_batch(pairs: &[StatusUpdate]) -> Result<Vec<(&str, EmailStatus)>> {
    if pairs.is_empty() {
        return Err(LeadStatusError::validation(
            "Bulk update requires a non-empty list of email/status pairs",
        ));
    }

    pairs
        .iter()
        .enumerate()
        .map(|(i, pair)| {
            EmailStatus::parse(&pair.status)
                .map(|status| (pair.email.as_str(), status))
                .map_err(|_| {
                    LeadStatusError::validation(format!(
                        "Invalid status: {} (entry {} for {}). Must be one of: {}",
                        pair.status,
                        i,
                        pair.email,
                        EmailStatus::allowed_values()
                    ))
                })
        })
        .collect()
}

fn affected_suffix(result: &QueryResult) -> String {
    match result.affected_rows {
        Some(n) => format!(" ({n} rows affected)"),
        None => String::new(),
    }
}

fn optional_string(result: &QueryResult, row: &Row, column: &str) -> Option<String> {
    result
        .value(row, column)
        .and_then(Value::as_str)
        .map(String::from)
}

fn required_string(result: &QueryResult, row: &Row, column: &str) -> Result<String> {
    optional_string(result, row, column)
        .ok_or_else(|| LeadStatusError::internal(format!("Missing {column} column in result")))
}
