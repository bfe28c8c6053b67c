// src/error.rs

//! Unified error handling for the lottery crawler.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Transport failure or non-success HTTP status from a source
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Payload could not be turned into draw records
    #[error("Parse error from {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// Primary and backup sources both failed
    #[error("All sources failed (primary: {primary}; backup: {backup})")]
    AllSourcesFailed { primary: String, backup: String },

    /// Persisting a record failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No stored draws to predict from
    #[error("No stored history for {0}; run a sync first")]
    EmptyHistory(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AppError {
    /// Create a network error for a request URL.
    pub fn network(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a parse error attributed to a source.
    pub fn parse(source_name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Combine the primary and backup failures.
    pub fn all_sources_failed(primary: impl fmt::Display, backup: impl fmt::Display) -> Self {
        Self::AllSourcesFailed {
            primary: primary.to_string(),
            backup: backup.to_string(),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Short category name, used for notification cooldown buckets.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } | Self::Http(_) => "network",
            Self::Parse { .. } | Self::Json(_) | Self::Toml(_) => "parse",
            Self::AllSourcesFailed { .. } => "all_sources_failed",
            Self::Storage(_) | Self::Io(_) => "storage",
            Self::Validation(_) => "validation",
            Self::Config(_) => "config",
            Self::EmptyHistory(_) => "empty_history",
        }
    }

    /// Errors caused by the request rather than by sources or storage.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::EmptyHistory(_))
    }
}
