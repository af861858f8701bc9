//! Email validation status values.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LeadStatusError, Result};

/// The closed set of values the `email_status` column may be set to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Unverified,
    Verified,
    AcceptAll,
    Invalid,
}

impl EmailStatus {
    /// All statuses, in declaration order.
    pub const ALL: [EmailStatus; 4] = [
        Self::Unverified,
        Self::Verified,
        Self::AcceptAll,
        Self::Invalid,
    ];

    /// Returns the value stored in the warehouse column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::Verified => "verified",
            Self::AcceptAll => "accept_all",
            Self::Invalid => "invalid",
        }
    }

    /// Parses a status. Matching is exact: `"Verified"` is rejected.
    pub fn parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                LeadStatusError::validation(format!(
                    "Invalid status: {s}. Must be one of: {}",
                    Self::allowed_values()
                ))
            })
    }

    /// Comma-separated list of accepted values, for error messages.
    pub fn allowed_values() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmailStatus {
    type Err = LeadStatusError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
