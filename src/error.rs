//! Error types for the highlighter
//!
//! Only structurally invalid configuration and async plumbing failures are
//! errors. Annotation itself never fails for data-dependent reasons.

use thiserror::Error;

/// Main error type for highlighter operations
#[derive(Error, Debug)]
pub enum HighlightError {
    /// A rule pattern failed to compile
    #[error("Invalid pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: Box<fancy_regex::Error>,
    },

    /// A rule table is structurally invalid
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Asynchronous dispatch failed (worker gone, channel closed, task failed)
    #[error("Dispatch error: {0}")]
    Dispatch(String),
}

/// Result type alias for highlighter operations
pub type Result<T> = std::result::Result<T, HighlightError>;

impl From<tokio::task::JoinError> for HighlightError {
    fn from(err: tokio::task::JoinError) -> Self {
        HighlightError::Dispatch(format!("annotation task failed: {}", err))
    }
}
