//! Command-line argument parsing for lead-status.

use crate::config::Config;
use crate::output::OutputFormat;
use crate::warehouse::WarehouseBackend;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Updates and reports lead email validation statuses in BigQuery.
#[derive(Parser, Debug)]
#[command(name = "lead-status")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Project that owns the dataset
    #[arg(short = 'p', long, value_name = "PROJECT")]
    pub project: Option<String>,

    /// Dataset holding the leads table
    #[arg(short = 'd', long, value_name = "DATASET")]
    pub dataset: Option<String>,

    /// Leads table name
    #[arg(short = 't', long, value_name = "TABLE")]
    pub table: Option<String>,

    /// Dataset location (e.g. US, EU)
    #[arg(long, value_name = "LOCATION")]
    pub location: Option<String>,

    /// Warehouse backend (bigquery or memory)
    #[arg(long, value_name = "BACKEND", value_parser = parse_backend)]
    pub backend: Option<WarehouseBackend>,

    /// Use the in-memory warehouse (same as --backend memory)
    #[arg(long, conflicts_with = "backend")]
    pub mock: bool,

    /// JSON file of leads to preload into the in-memory warehouse
    #[arg(long, value_name = "PATH")]
    pub seed: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set the status of one lead
    Update {
        /// Email address (matched case- and whitespace-insensitively)
        email: String,
        /// One of: unverified, verified, accept_all, invalid
        status: String,
    },

    /// Set the status of many leads in one statement
    BulkUpdate {
        /// JSON array or `email,status` lines; "-" or omitted reads stdin
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Show one lead
    Get {
        /// Email address
        email: String,
    },

    /// Count leads per status
    Counts,

    /// Run a sample update, bulk update, lookup and count report
    Demo,
}

fn parse_backend(s: &str) -> std::result::Result<WarehouseBackend, String> {
    WarehouseBackend::parse(s)
        .ok_or_else(|| format!("Invalid backend: {s}. Expected: bigquery or memory"))
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Overrides config values with those given on the command line.
    pub fn apply_to(&self, config: &mut Config) {
        let warehouse = &mut config.warehouse;
        if let Some(project) = &self.project {
            warehouse.project = Some(project.clone());
        }
        if let Some(dataset) = &self.dataset {
            warehouse.dataset = Some(dataset.clone());
        }
        if let Some(table) = &self.table {
            warehouse.table = Some(table.clone());
        }
        if let Some(location) = &self.location {
            warehouse.location = Some(location.clone());
        }
        if let Some(backend) = self.backend {
            warehouse.backend = backend;
        }
        if self.mock {
            warehouse.backend = WarehouseBackend::Memory;
        }
        if let Some(seed) = &self.seed {
            warehouse.seed = Some(seed.clone());
        }
    }
}
