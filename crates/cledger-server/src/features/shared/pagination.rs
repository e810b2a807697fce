//! Shared pagination utilities
//!
//! Reads are offset/limit based; the response echoes the effective window.

use cledger_common::types::ActionCriteria;
use serde::{Deserialize, Serialize};

/// Pagination metadata for list responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    /// Effective page size after defaulting and capping
    pub limit: i64,

    pub offset: i64,

    /// Items in this page
    pub returned: usize,
}

impl PaginationMetadata {
    pub fn new(limit: i64, offset: i64, returned: usize) -> Self {
        Self {
            limit,
            offset,
            returned,
        }
    }

    pub fn from_criteria(criteria: &ActionCriteria, returned: usize) -> Self {
        Self::new(criteria.limit, criteria.offset, returned)
    }
}
