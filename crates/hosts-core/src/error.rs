//! Error types for the hosts updater
//!
//! This module defines all error types used throughout the crate.
//! The reconciler itself never fails; every variant here belongs to one of
//! its collaborators (snapshot sources, table stores, configuration).

use std::fmt;
use thiserror::Error;

/// Result type alias for hosts updater operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the hosts updater
#[derive(Error, Debug)]
pub enum Error {
    /// The snapshot source could not be reached or its response not read
    #[error("Snapshot source error: {0}")]
    Source(String),

    /// Table store errors (reading or writing the table)
    #[error("Table store error: {0}")]
    Store(String),

    /// The persisted table could not be parsed
    #[error("{0}")]
    Parse(ParseErrors),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors (from router APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a snapshot source error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a table store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error stems from configuration rather than runtime I/O
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidInput(_))
    }
}

/// A single malformed line in a persisted table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    /// 1-based line number
    pub line: usize,
    /// What was wrong with the line
    pub message: String,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Every parse failure found while loading a table
///
/// Reported together so a partially parsed table never silently drops
/// entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseErrors {
    /// Source the lines came from (usually a file path)
    pub origin: String,
    /// The individual failures, in line order
    pub errors: Vec<LineError>,
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error(s) parsing {}:",
            self.errors.len(),
            self.origin
        )?;
        for error in &self.errors {
            write!(f, " [{}]", error)?;
        }
        Ok(())
    }
}
