//! Error types shared across cledger crates

use thiserror::Error;

use crate::types::ActionStatus;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised by the shared domain model
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: ActionStatus, to: ActionStatus },

    #[error("Unknown {kind} value: '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    #[error("Confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),
}

impl CommonError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
