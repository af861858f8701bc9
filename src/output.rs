//! Output formatting for command results.
//!
//! Provides two formats: human-readable text and JSON.

use serde::Serialize;

use crate::leads::{LeadRecord, StatusCount};

/// Output format selected with `--output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain text lines.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Result of one command, ready to be rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Updated { email: String, status: String },
    BulkUpdated { count: usize },
    Lead { email: String, lead: Option<LeadRecord> },
    Counts { counts: Vec<StatusCount> },
}

/// Renders [`Outcome`]s in the configured format.
pub struct Report {
    format: OutputFormat,
}

impl Report {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the outcome. Text output always ends with a newline.
    pub fn format(&self, outcome: &Outcome) -> String {
        match self.format {
            OutputFormat::Text => format_text(outcome),
            OutputFormat::Json => format_json(outcome),
        }
    }
}

fn format_text(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Updated { email, status } => {
            format!("Updated {email} -> {status}\n")
        }
        Outcome::BulkUpdated { count } => {
            format!("Bulk updated {count} email statuses\n")
        }
        Outcome::Lead { email, lead: None } => {
            format!("No lead found for {email}\n")
        }
        Outcome::Lead {
            lead: Some(lead), ..
        } => format!(
            "email:        {}\nemail_status: {}\ntrackingId:   {}\n",
            lead.email,
            lead.email_status.as_deref().unwrap_or("NULL"),
            lead.tracking_id.as_deref().unwrap_or("NULL"),
        ),
        Outcome::Counts { counts } if counts.is_empty() => "No leads\n".to_string(),
        Outcome::Counts { counts } => {
            let width = counts
                .iter()
                .map(|c| c.email_status.as_deref().unwrap_or("NULL").len())
                .max()
                .unwrap_or(0)
                .max("total".len());
            let total: u64 = counts.iter().map(|c| c.count).sum();

            let mut out = String::from("Email Status Summary:\n");
            for c in counts {
                let label = c.email_status.as_deref().unwrap_or("NULL");
                out.push_str(&format!("  {label:<width$}  {}\n", c.count));
            }
            out.push_str(&format!("  {:<width$}  {total}\n", "total"));
            out
        }
    }
}

fn format_json(outcome: &Outcome) -> String {
    serde_json::to_string_pretty(outcome)
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize: {}\"}}", e))
}
