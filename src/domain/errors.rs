//! Domain error types
//!
//! This module defines the error hierarchy for quarry. Errors are
//! domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main quarry error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum QuarryError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Catalog lookups (table listing, selection manifest)
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// External dump tool errors
    #[error("Dump error: {0}")]
    Dump(#[from] DumpError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Failures of a single external dump invocation or of writing its output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DumpError {
    /// The tool could not be started at all
    #[error("Failed to spawn {tool}: {message}")]
    Spawn { tool: String, message: String },

    /// The tool ran and reported failure through its exit status
    #[error("{tool} exited with {}: {stderr}", describe_exit_code(.code))]
    Exit {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The captured output could not be written to its artifact
    #[error("Failed to write artifact: {0}")]
    Write(String),
}

fn describe_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl DumpError {
    /// Short label for the failure class, used in logs and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            DumpError::Spawn { .. } => "spawn",
            DumpError::Exit { .. } => "exit",
            DumpError::Write(_) => "write",
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for QuarryError {
    fn from(err: std::io::Error) -> Self {
        QuarryError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for QuarryError {
    fn from(err: serde_json::Error) -> Self {
        QuarryError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for QuarryError {
    fn from(err: toml::de::Error) -> Self {
        QuarryError::Configuration(format!("TOML parse error: {err}"))
    }
}
