//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function. Rendering is
//! kept in pure functions returning `String` so it can be tested without a
//! server.

pub mod get;
pub mod list;
pub mod reconcile;
pub mod record;
pub mod stats;
pub mod status;

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use serde::Serialize;

use cledger_common::types::{ComplianceAction, StepOutcome};

use crate::error::Result;

/// Pretty JSON for `--format json`
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub(crate) fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table
}

/// One row per action, as shown by `list`
pub(crate) fn actions_table(actions: &[ComplianceAction]) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "ID", "Timestamp", "Policy", "Action", "Severity", "Status", "Confidence",
    ]);

    for action in actions {
        table.add_row(vec![
            action.id.to_string(),
            action.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            action.policy_id.clone(),
            truncate_string(&action.action_taken, 32),
            action.severity.to_string(),
            action.status.to_string(),
            format!("{:.2}", action.confidence),
        ]);
    }

    table
}

/// Field/value table for a single action
pub(crate) fn action_detail_table(action: &ComplianceAction) -> Table {
    let mut table = new_table();

    table.add_row(vec!["ID".to_string(), action.id.to_string()]);
    table.add_row(vec!["Policy".to_string(), action.policy_id.clone()]);
    table.add_row(vec!["Action".to_string(), action.action_taken.clone()]);
    table.add_row(vec!["Status".to_string(), action.status.to_string()]);
    table.add_row(vec!["Severity".to_string(), action.severity.to_string()]);
    table.add_row(vec![
        "Confidence".to_string(),
        format!("{:.2}", action.confidence),
    ]);
    table.add_row(vec!["Timestamp".to_string(), action.timestamp.to_rfc3339()]);

    if let Some(ref threat) = action.threat_description {
        table.add_row(vec!["Threat".to_string(), threat.clone()]);
    }
    if !action.target_endpoints.is_empty() {
        let endpoints: Vec<&str> = action.target_endpoints.iter().map(String::as_str).collect();
        table.add_row(vec!["Endpoints".to_string(), endpoints.join(", ")]);
    }
    table.add_row(vec![
        "Ledger proof".to_string(),
        action.ledger_proof.clone().unwrap_or_else(|| "-".to_string()),
    ]);

    table
}

pub(crate) fn describe_outcome(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Applied => "applied".to_string(),
        StepOutcome::Skipped { reason } => format!("skipped ({})", reason),
        StepOutcome::Failed { reason } => format!("failed ({})", reason),
    }
}

/// Truncate a string to a maximum number of characters with ellipsis
pub(crate) fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
