//! API endpoint URL builders
//!
//! Helper functions to construct API endpoint URLs.

use uuid::Uuid;

fn compliance_url(base_url: &str, path: &str) -> String {
    format!("{}/api/v1/compliance{}", base_url.trim_end_matches('/'), path)
}

/// Build the action collection URL (record and list)
pub fn actions_url(base_url: &str) -> String {
    compliance_url(base_url, "/actions")
}

/// Build a single action URL
pub fn action_url(base_url: &str, id: Uuid) -> String {
    compliance_url(base_url, &format!("/actions/{}", id))
}

pub fn reconcile_url(base_url: &str) -> String {
    compliance_url(base_url, "/reconcile")
}

pub fn stats_url(base_url: &str) -> String {
    compliance_url(base_url, "/stats")
}

/// Build health check URL
pub fn health_url(base_url: &str) -> String {
    format!("{}/health", base_url.trim_end_matches('/'))
}
