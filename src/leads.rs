//! Lead rows as read from the warehouse, and the pairs used to update them.

use serde::{Deserialize, Serialize};

use crate::status::EmailStatus;

/// Lower-cases an email and strips surrounding whitespace.
///
/// This is the same normalization the generated SQL applies on both sides
/// of every comparison (`LOWER(TRIM(...))`).
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A row of the external leads table. Only `email_status` is ever written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub email: String,

    /// Raw column value. The table is not owned by this crate, so it may be
    /// NULL or hold a value outside [`EmailStatus`].
    #[serde(default)]
    pub email_status: Option<String>,

    #[serde(rename = "trackingId", default)]
    pub tracking_id: Option<String>,
}

impl LeadRecord {
    pub fn new(
        email: impl Into<String>,
        email_status: Option<&str>,
        tracking_id: Option<&str>,
    ) -> Self {
        Self {
            email: email.into(),
            email_status: email_status.map(String::from),
            tracking_id: tracking_id.map(String::from),
        }
    }

    /// Parses the stored status, if it is one of the known values.
    pub fn status(&self) -> Option<EmailStatus> {
        self.email_status
            .as_deref()
            .and_then(|s| EmailStatus::parse(s).ok())
    }
}

/// Number of leads sharing one `email_status` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    /// `None` groups the rows whose status is NULL.
    pub email_status: Option<String>,
    pub count: u64,
}

impl StatusCount {
    pub fn status(&self) -> Option<EmailStatus> {
        self.email_status
            .as_deref()
            .and_then(|s| EmailStatus::parse(s).ok())
    }
}

/// One requested `(email, status)` change, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub email: String,
    pub status: String,
}

impl StatusUpdate {
    pub fn new(email: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            status: status.into(),
        }
    }
}

impl<E: Into<String>, S: Into<String>> From<(E, S)> for StatusUpdate {
    fn from((email, status): (E, S)) -> Self {
        Self::new(email, status)
    }
}
