//! `cledger record` command implementation
//!
//! Records a compliance action and reports what happened at each step.

use colored::Colorize;

use cledger_common::types::WriteHealth;

use crate::api::{ApiClient, RecordActionRequest, RecordedAction};
use crate::commands::{action_detail_table, describe_outcome, to_json};
use crate::error::Result;
use crate::OutputFormat;

pub async fn run(
    client: &ApiClient,
    request: RecordActionRequest,
    format: OutputFormat,
) -> Result<()> {
    tracing::debug!(policy_id = %request.policy_id, "Recording compliance action");

    let recorded = client.record(&request).await?;

    match format {
        OutputFormat::Json => println!("{}", to_json(&recorded)?),
        OutputFormat::Table => print!("{}", render(&recorded)),
    }

    Ok(())
}

fn render(recorded: &RecordedAction) -> String {
    let headline = match recorded.health {
        WriteHealth::Complete => "Action recorded".green().bold(),
        WriteHealth::Degraded => "Action recorded (degraded)".yellow().bold(),
        WriteHealth::LedgerFailed => "Ledger write failed".red().bold(),
    };

    let mut out = String::new();
    out.push_str(&format!("{}\n\n", headline));
    out.push_str(&format!("{}\n\n", action_detail_table(&recorded.action)));
    out.push_str(&format!(
        "  Ledger ({}): {}\n",
        recorded.ledger_mode,
        describe_outcome(&recorded.ledger)
    ));
    out.push_str(&format!("  Index:       {}\n", describe_outcome(&recorded.index)));
    out.push_str(&format!(
        "  Enforcement: {}\n",
        describe_outcome(&recorded.enforcement)
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cledger_common::types::{ActionStatus, ComplianceAction, StepOutcome};

    fn recorded(health: WriteHealth, index: StepOutcome) -> RecordedAction {
        let mut action = ComplianceAction::new("POL-003", "BLOCK_RDP_PORT", 0.92);
        action.transition(ActionStatus::Executed).unwrap();
        RecordedAction {
            action,
            ledger: StepOutcome::Applied,
            index,
            enforcement: StepOutcome::skipped("no enforcement hook configured"),
            health,
            ledger_mode: "local".to_string(),
        }
    }

    #[test]
    fn test_render_complete() {
        let out = render(&recorded(WriteHealth::Complete, StepOutcome::Applied));
        assert!(out.contains("Action recorded"));
        assert!(out.contains("Ledger (local): applied"));
        assert!(out.contains("skipped (no enforcement hook configured)"));
    }

    #[test]
    fn test_render_degraded_shows_index_failure() {
        let out = render(&recorded(
            WriteHealth::Degraded,
            StepOutcome::failed("pool closed"),
        ));
        assert!(out.contains("degraded"));
        assert!(out.contains("Index:       failed (pool closed)"));
    }
}
