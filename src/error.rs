//! Error types for soilq.
//!
//! Defines the main error enum used throughout the pipeline.

use thiserror::Error;

/// Main error type for soilq operations.
#[derive(Error, Debug)]
pub enum SoilqError {
    /// Guard rejections (semicolon, non-SELECT prefix, unknown table or
    /// column, banned keyword, non-allowlisted table). Always raised
    /// before any execution.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Execution failures (connection failure, HTTP failure or timeout,
    /// malformed response body, wrong projection arity).
    #[error("Execution error: {0}")]
    Execution(String),

    /// Schema failures (target layer missing 'mukey', introspection failure).
    #[error("Schema error: {0}")]
    Schema(String),

    /// Materialization failures (series requested without component rows,
    /// layer store failures).
    #[error("Materialization error: {0}")]
    Materialization(String),

    /// SQL planner failures (API errors, empty plans).
    #[error("Planner error: {0}")]
    Planner(String),

    /// Configuration errors (bad config file, invalid endpoint, bad CLI combos).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SoilqError {
    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a schema error with the given message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Creates a materialization error with the given message.
    pub fn materialization(msg: impl Into<String>) -> Self {
        Self::Materialization(msg.into())
    }

    /// Creates a planner error with the given message.
    pub fn planner(msg: impl Into<String>) -> Self {
        Self::Planner(msg.into())
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
            Self::Execution(_) => "Execution Error",
            Self::Schema(_) => "Schema Error",
            Self::Materialization(_) => "Materialization Error",
            Self::Planner(_) => "Planner Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using SoilqError.
pub type Result<T> = std::result::Result<T, SoilqError>;
