//! cledger Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the cledger workspace.
//!
//! # Overview
//!
//! This crate provides the functionality shared by the server and the CLI:
//!
//! - **Types**: the `ComplianceAction` record, its status lifecycle, and query filters
//! - **Error Handling**: validation and lifecycle errors
//! - **Logging**: centralized `tracing` initialization
//!
//! # Example
//!
//! ```no_run
//! use cledger_common::types::{ActionStatus, ComplianceAction, ConfidencePolicy};
//!
//! fn finalize(mut action: ComplianceAction) -> cledger_common::Result<ComplianceAction> {
//!     action.transition(ActionStatus::Executed)?;
//!     Ok(action)
//! }
//!
//! let confidence = ConfidencePolicy::Clamp.apply(Some(1.5)).unwrap_or_default();
//! assert_eq!(confidence, 1.0);
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
