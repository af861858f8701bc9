//! Error types for lead-status.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for lead-status operations.
#[derive(Error, Debug)]
pub enum LeadStatusError {
    /// Caller input rejected locally, before anything is sent to the warehouse
    /// (unknown status value, empty batch, etc.)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Anything the query service reports (malformed query, permission
    /// failure, transport fault). The message is passed through unmodified.
    #[error("Remote execution error: {0}")]
    Remote(String),

    /// Obtaining an access token for the query service failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Configuration errors (invalid config file, missing project, unreadable input, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (unexpected response shapes, poisoned state, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LeadStatusError {
    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a remote execution error with the given message.
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Creates an authentication error with the given message.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation Error",
            Self::Remote(_) => "Remote Execution Error",
            Self::Auth(_) => "Authentication Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true if the error was raised locally before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias using LeadStatusError.
pub type Result<T> = std::result::Result<T, LeadStatusError>;
