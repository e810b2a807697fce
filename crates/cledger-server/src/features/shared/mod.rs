//! Shared utilities and types for feature modules
//!
//! # Contents
//!
//! - **deadline**: Per-call timeouts mapped onto backend errors
//! - **pagination**: Offset/limit metadata for list responses
//! - **validation**: Input validation utilities
//! - **test_helpers**: Test fixtures and ledger doubles (test-only)

pub mod deadline;
pub mod pagination;
pub mod validation;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub mod test_helpers;

// Re-export commonly used types
pub use deadline::with_deadline;
pub use pagination::PaginationMetadata;
pub use validation::{
    validate_endpoints, validate_optional_text, validate_required_text, FieldValidationError,
};
