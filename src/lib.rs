//! lead-status - reads and writes the email validation status of sales leads
//! stored in a BigQuery table.
//!
//! This library exposes the core modules for the binary and for integration tests.

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod leads;
pub mod logging;
pub mod output;
pub mod statements;
pub mod status;
pub mod updater;
pub mod warehouse;
