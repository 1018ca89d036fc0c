// src/error.rs

//! Unified error handling for the harvester.

use std::fmt;

use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Document filter pattern failed to compile
    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    /// Configuration error (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration value out of range
    #[error("Validation error: {0}")]
    Validation(String),

    /// Rate limiting, server error or flaky transport; worth retrying
    #[error("Transient error for {context}: {message}")]
    Transient { context: String, message: String },

    /// Non-retryable failure, or retries exhausted
    #[error("Request failed for {context}: {message}")]
    Fatal { context: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a transient (retryable) error with context.
    pub fn transient(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transient {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a fatal (non-retryable) error with context.
    pub fn fatal(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fatal {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether the retry loop should try again after this error.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transient { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Demote any error to `Fatal`, keeping its message.
    pub fn into_fatal(self, context: impl Into<String>) -> Self {
        match self {
            Self::Fatal { .. } => self,
            Self::Transient { message, .. } => Self::Fatal {
                context: context.into(),
                message,
            },
            other => Self::fatal(context, other),
        }
    }
}
