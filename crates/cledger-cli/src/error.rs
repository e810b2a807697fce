//! Error types for the cledger CLI
//!
//! User-facing errors with clear messages that say what to check next.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// The server answered with an error envelope
    #[error("Server error ({code}): {message}")]
    Api { code: String, message: String },

    /// The server rejected the input
    #[error("Invalid request: {0}")]
    Validation(String),

    /// No backend holds the requested action
    #[error("Compliance action '{0}' not found")]
    NotFound(String),

    /// HTTP request failed
    #[error("Network request failed: {0}. Check that the server is running and CLEDGER_SERVER_URL is correct.")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Argument or environment problem
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CliError {
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
