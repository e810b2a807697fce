//! Shared validation utilities
//!
//! Field checks used by commands before anything is written.
//!
//! # Examples
//!
//! ```rust,ignore
//! use cledger_server::features::shared::validation::{validate_required_text, validate_endpoints};
//!
//! let policy_id = validate_required_text(&command.policy_id, "policyId", 128)?;
//! let endpoints = validate_endpoints(command.target_endpoints.as_deref().unwrap_or_default(), 255)?;
//! ```

use thiserror::Error;

/// Errors that can occur during field validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldValidationError {
    #[error("{field} is required and cannot be empty")]
    Required { field: &'static str },

    #[error("{field} must be at most {max_length} characters")]
    TooLong {
        field: &'static str,
        max_length: usize,
    },

    #[error("targetEndpoints entries cannot be empty")]
    EmptyEndpoint,
}

/// Trim a required text field and check its length
///
/// # Rules
/// - Must not be empty after trimming whitespace
/// - Must not exceed `max_length` characters
pub fn validate_required_text(
    value: &str,
    field: &'static str,
    max_length: usize,
) -> Result<String, FieldValidationError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(FieldValidationError::Required { field });
    }

    if trimmed.chars().count() > max_length {
        return Err(FieldValidationError::TooLong { field, max_length });
    }

    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank becomes `None`
pub fn validate_optional_text(
    value: Option<&str>,
    field: &'static str,
    max_length: usize,
) -> Result<Option<String>, FieldValidationError> {
    let Some(trimmed) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if trimmed.chars().count() > max_length {
        return Err(FieldValidationError::TooLong { field, max_length });
    }

    Ok(Some(trimmed.to_string()))
}

/// Trim endpoint names, rejecting blank or overlong entries
pub fn validate_endpoints(
    endpoints: &[String],
    max_length: usize,
) -> Result<Vec<String>, FieldValidationError> {
    endpoints
        .iter()
        .map(|endpoint| {
            let trimmed = endpoint.trim();
            if trimmed.is_empty() {
                Err(FieldValidationError::EmptyEndpoint)
            } else if trimmed.chars().count() > max_length {
                Err(FieldValidationError::TooLong {
                    field: "targetEndpoints",
                    max_length,
                })
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}
