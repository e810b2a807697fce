//! API request and response types
//!
//! Matches the server's JSON surface.

use std::collections::BTreeMap;

use cledger_common::types::{ComplianceAction, StepOutcome, WriteHealth};
use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

/// Error envelope returned with non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Request body for recording an action
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordActionRequest {
    pub policy_id: String,
    pub action_taken: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub target_endpoints: Vec<String>,
}

/// Result of recording an action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedAction {
    pub action: ComplianceAction,
    pub ledger: StepOutcome,
    pub index: StepOutcome,
    pub enforcement: StepOutcome,
    pub health: WriteHealth,
    pub ledger_mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
    pub returned: usize,
}

/// One page of actions and the tier that served it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionList {
    pub items: Vec<ComplianceAction>,
    pub source: String,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedAction {
    pub action: ComplianceAction,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub scanned: u64,
    pub inserted: u64,
    pub advanced: u64,
    pub conflicts: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceStats {
    pub ledger_mode: String,
    pub indexed_actions: i64,
    pub by_status: BTreeMap<String, i64>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub ledger_mode: String,
    pub index: String,
}
