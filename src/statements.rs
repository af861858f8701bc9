//! Parameterized statements against the leads table.
//!
//! Every caller-supplied value travels as a bound `@parameter`; the only
//! text spliced into statements is the validated table identifier and
//! generated placeholder names.

use crate::status::EmailStatus;
use crate::warehouse::{QueryRequest, TableRef};

/// `LOWER(TRIM(email)) = LOWER(TRIM(@<param>))`
fn email_matches(param: &str) -> String {
    format!("LOWER(TRIM(email)) = LOWER(TRIM(@{param}))")
}

/// Builds the statements for one leads table.
#[derive(Debug, Clone)]
pub struct LeadStatements {
    table: TableRef,
}

impl LeadStatements {
    pub fn new(table: TableRef) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// Sets the status of every row whose normalized email matches.
    pub fn update_one(&self, email: &str, status: EmailStatus) -> QueryRequest {
        let sql = format!(
            "UPDATE {}\nSET email_status = @status\nWHERE {}",
            self.table.quoted(),
            email_matches("email")
        );
        QueryRequest::new(sql)
            .bind("email", email)
            .bind("status", status.as_str())
    }

    /// One UPDATE covering every pair.
    ///
    /// CASE branches follow input order, so when the same email appears more
    /// than once the first pair's status is the one applied.
    pub fn update_many(&self, pairs: &[(&str, EmailStatus)]) -> QueryRequest {
        let branches: Vec<String> = (0..pairs.len())
            .map(|i| format!("    WHEN {} THEN @status{i}", email_matches(&format!("email{i}"))))
            .collect();
        let email_list: Vec<String> = (0..pairs.len())
            .map(|i| format!("LOWER(TRIM(@email{i}))"))
            .collect();

        let sql = format!(
            "UPDATE {}\nSET email_status = CASE\n{}\n    ELSE email_status\n  END\nWHERE LOWER(TRIM(email)) IN ({})",
            self.table.quoted(),
            branches.join("\n"),
            email_list.join(", ")
        );

        pairs
            .iter()
            .enumerate()
            .fold(QueryRequest::new(sql), |request, (i, (email, status))| {
                request
                    .bind(format!("email{i}"), *email)
                    .bind(format!("status{i}"), status.as_str())
            })
    }

    /// Looks up at most one lead by normalized email.
    pub fn get_one(&self, email: &str) -> QueryRequest {
        let sql = format!(
            "SELECT email, email_status, trackingId\nFROM {}\nWHERE {}\nLIMIT 1",
            self.table.quoted(),
            email_matches("email")
        );
        QueryRequest::new(sql).bind("email", email)
    }

    /// Row counts per distinct status, largest first.
    pub fn status_counts(&self) -> QueryRequest {
        QueryRequest::new(format!(
            "SELECT email_status, COUNT(*) AS count\nFROM {}\nGROUP BY email_status\nORDER BY count DESC",
            self.table.quoted()
        ))
    }
}
