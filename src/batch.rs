//! Reading bulk update input.
//!
//! Accepts either a JSON array of `{"email": ..., "status": ...}` objects or
//! plain text with one `email,status` pair per line. Blank lines and lines
//! starting with `#` are skipped in the text form.

use std::io::Read;
use std::path::Path;

use crate::error::{LeadStatusError, Result};
use crate::leads::StatusUpdate;

/// Reads pairs from `path`, or from stdin when `path` is `-`.
pub fn read_pairs(path: &Path) -> Result<Vec<StatusUpdate>> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| LeadStatusError::config(format!("Failed to read stdin: {e}")))?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| {
            LeadStatusError::config(format!("Failed to read {}: {e}", path.display()))
        })?
    };
    parse_pairs(&content)
}

/// Parses batch input in either supported format.
pub fn parse_pairs(content: &str) -> Result<Vec<StatusUpdate>> {
    if content.trim_start().starts_with('[') {
        return serde_json::from_str(content)
            .map_err(|e| LeadStatusError::config(format!("Invalid JSON batch: {e}")));
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            let (email, status) = line.split_once(',').ok_or_else(|| {
                LeadStatusError::config(format!(
                    "Line {}: expected 'email,status', got '{}'",
                    i + 1,
                    line.trim()
                ))
            })?;
            Ok(StatusUpdate::new(email.trim(), status.trim()))
        })
        .collect()
}
