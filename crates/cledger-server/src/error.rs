//! Server-specific error types
//!
//! Backend errors live next to their backends (`LedgerError`, `IndexError`,
//! `EnforcementError`) and each command or query owns its own error enum.
//! `ServerError` covers wiring the service together at startup.

use thiserror::Error;

use crate::enforcement::EnforcementError;
use crate::index::IndexError;

/// Result type alias for server operations
pub type ServerResult<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Enforcement setup failed: {0}")]
    Enforcement(#[from] EnforcementError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
