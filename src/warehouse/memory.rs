//! In-memory warehouse for offline runs and tests.
//!
//! Executes the statement shapes built by [`crate::statements`] against a
//! vector of lead rows. Anything else is rejected the way the real service
//! rejects a query it cannot run.

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Instant;
use tracing::debug;

use super::{ColumnInfo, QueryRequest, QueryResult, QueryService, Value};
use crate::error::{LeadStatusError, Result};
use crate::leads::{normalize_email, LeadRecord};

const EMAIL_MATCH: &str = r"LOWER\(TRIM\(email\)\)\s*=\s*LOWER\(TRIM\(@(\w+)\)\)";
const TABLE: &str = r"`[^`]+`";

struct Patterns {
    update_one: Regex,
    update_many: Regex,
    branch: Regex,
    in_param: Regex,
    get_one: Regex,
    status_counts: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile = |pattern: String| Regex::new(&pattern).expect("statement pattern is valid");
        Patterns {
            update_one: compile(format!(
                r"(?s)^\s*UPDATE\s+{TABLE}\s+SET\s+email_status\s*=\s*@(\w+)\s+WHERE\s+{EMAIL_MATCH}\s*$"
            )),
            update_many: compile(format!(
                r"(?s)^\s*UPDATE\s+{TABLE}\s+SET\s+email_status\s*=\s*CASE\s+(.*?)\s+ELSE\s+email_status\s+END\s+WHERE\s+LOWER\(TRIM\(email\)\)\s+IN\s*\((.*)\)\s*$"
            )),
            branch: compile(format!(r"WHEN\s+{EMAIL_MATCH}\s+THEN\s+@(\w+)")),
            in_param: compile(r"LOWER\(TRIM\(@(\w+)\)\)".to_string()),
            get_one: compile(format!(
                r"(?s)^\s*SELECT\s+email,\s*email_status,\s*trackingId\s+FROM\s+{TABLE}\s+WHERE\s+{EMAIL_MATCH}\s+LIMIT\s+1\s*$"
            )),
            status_counts: compile(format!(
                r"(?s)^\s*SELECT\s+email_status,\s*COUNT\(\*\)\s+AS\s+count\s+FROM\s+{TABLE}\s+GROUP\s+BY\s+email_status\s+ORDER\s+BY\s+count\s+DESC\s*$"
            )),
        }
    })
}

/// A leads table held in memory.
#[derive(Debug, Default)]
pub struct MemoryWarehouse {
    rows: Mutex<Vec<LeadRecord>>,
    queries_run: AtomicUsize,
}

impl MemoryWarehouse {
    /// Creates an empty warehouse.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a warehouse holding the given rows, in table order.
    pub fn with_leads(leads: Vec<LeadRecord>) -> Self {
        Self {
            rows: Mutex::new(leads),
            queries_run: AtomicUsize::new(0),
        }
    }

    /// Loads rows from a JSON array of lead objects.
    pub fn from_seed_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LeadStatusError::config(format!("Failed to read seed file {}: {e}", path.display()))
        })?;
        let leads: Vec<LeadRecord> = serde_json::from_str(&content).map_err(|e| {
            LeadStatusError::config(format!("Invalid seed file {}: {e}", path.display()))
        })?;
        debug!("Seeded memory warehouse with {} leads", leads.len());
        Ok(Self::with_leads(leads))
    }

    /// Returns a copy of the current rows.
    pub fn leads(&self) -> Result<Vec<LeadRecord>> {
        Ok(self.lock()?.clone())
    }

    /// Number of statements submitted so far, including rejected ones.
    pub fn queries_run(&self) -> usize {
        self.queries_run.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<LeadRecord>>> {
        self.rows
            .lock()
            .map_err(|_| LeadStatusError::internal("Memory warehouse lock poisoned"))
    }

    fn execute(&self, request: &QueryRequest) -> Result<QueryResult> {
        let patterns = patterns();
        let sql = request.sql.as_str();

        if let Some(caps) = patterns.update_one.captures(sql) {
            let status = bound(request, &caps[1])?;
            let email = normalize_email(bound(request, &caps[2])?);
            return self.update_one(&email, status);
        }

        if let Some(caps) = patterns.update_many.captures(sql) {
            let branches = patterns
                .branch
                .captures_iter(&caps[1])
                .map(|b| -> Result<(String, String)> {
                    Ok((
                        normalize_email(bound(request, &b[1])?),
                        bound(request, &b[2])?.to_string(),
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            let targets = patterns
                .in_param
                .captures_iter(&caps[2])
                .map(|p| bound(request, &p[1]).map(normalize_email))
                .collect::<Result<HashSet<_>>>()?;
            return self.update_many(&branches, &targets);
        }

        if let Some(caps) = patterns.get_one.captures(sql) {
            let email = normalize_email(bound(request, &caps[1])?);
            return self.get_one(&email);
        }

        if patterns.status_counts.is_match(sql) {
            return self.status_counts();
        }

        Err(LeadStatusError::remote(format!(
            "Unsupported statement for memory warehouse: {}",
            sql.lines().next().unwrap_or_default()
        )))
    }

    fn update_one(&self, email: &str, status: &str) -> Result<QueryResult> {
        let mut rows = self.lock()?;
        let mut affected = 0;
        for row in rows.iter_mut().filter(|r| normalize_email(&r.email) == email) {
            row.email_status = Some(status.to_string());
            affected += 1;
        }
        Ok(QueryResult::new().with_affected_rows(affected))
    }

    /// CASE semantics: the first matching branch wins, unmatched rows keep their value.
    fn update_many(
        &self,
        branches: &[(String, String)],
        targets: &HashSet<String>,
    ) -> Result<QueryResult> {
        let mut rows = self.lock()?;
        let mut affected = 0;
        for row in rows.iter_mut() {
            let email = normalize_email(&row.email);
            if !targets.contains(&email) {
                continue;
            }
            if let Some((_, status)) = branches.iter().find(|(branch, _)| *branch == email) {
                row.email_status = Some(status.clone());
            }
            affected += 1;
        }
        Ok(QueryResult::new().with_affected_rows(affected))
    }

    fn get_one(&self, email: &str) -> Result<QueryResult> {
        let rows = self.lock()?;
        let found: Vec<_> = rows
            .iter()
            .find(|r| normalize_email(&r.email) == email)
            .map(|r| {
                vec![
                    Value::from(r.email.as_str()),
                    Value::from(r.email_status.clone()),
                    Value::from(r.tracking_id.clone()),
                ]
            })
            .into_iter()
            .collect();

        Ok(QueryResult::with_data(
            vec![
                ColumnInfo::new("email", "STRING"),
                ColumnInfo::new("email_status", "STRING"),
                ColumnInfo::new("trackingId", "STRING"),
            ],
            found,
        ))
    }

    /// GROUP BY with NULL as its own group; ties keep first-seen order.
    fn status_counts(&self) -> Result<QueryResult> {
        let rows = self.lock()?;
        let mut groups: Vec<(Option<String>, i64)> = Vec::new();
        for row in rows.iter() {
            match groups.iter_mut().find(|(status, _)| *status == row.email_status) {
                Some((_, count)) => *count += 1,
                None => groups.push((row.email_status.clone(), 1)),
            }
        }
        groups.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(QueryResult::with_data(
            vec![
                ColumnInfo::new("email_status", "STRING"),
                ColumnInfo::new("count", "INTEGER"),
            ],
            groups
                .into_iter()
                .map(|(status, count)| vec![Value::from(status), Value::Int(count)])
                .collect(),
        ))
    }
}

fn bound<'a>(request: &'a QueryRequest, name: &str) -> Result<&'a str> {
    request.param(name).ok_or_else(|| {
        LeadStatusError::remote(format!("Undeclared query parameters: @{name}"))
    })
}

#[async_trait]
impl QueryService for MemoryWarehouse {
    async fn run_query(&self, request: &QueryRequest) -> Result<QueryResult> {
        let start = Instant::now();
        self.queries_run.fetch_add(1, Ordering::SeqCst);
        let result = self.execute(request)?;
        Ok(result.with_execution_time(start.elapsed()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
