//! Built-in records served when neither the ledger nor the index answers
//!
//! Ids and timestamps are fixed so repeated reads are identical.

use chrono::{DateTime, TimeZone, Utc};
use cledger_common::types::{ActionStatus, ComplianceAction, Severity};
use uuid::Uuid;

struct Seed {
    id: u128,
    policy_id: &'static str,
    action_taken: &'static str,
    description: &'static str,
    confidence: f64,
    endpoints: &'static [&'static str],
    status: ActionStatus,
    hour: u32,
}

// Newest first.
const SEEDS: [Seed; 3] = [
    Seed {
        id: 0x0000_0000_0000_4000_8000_0000_0000_0003,
        policy_id: "POL-007",
        action_taken: "ISOLATE_ENDPOINT",
        description: "Ransomware beaconing from finance workstation",
        confidence: 0.97,
        endpoints: &["ws-finance-03"],
        status: ActionStatus::Failed,
        hour: 12,
    },
    Seed {
        id: 0x0000_0000_0000_4000_8000_0000_0000_0002,
        policy_id: "POL-003",
        action_taken: "BLOCK_RDP_PORT",
        description: "RDP brute force against exposed servers",
        confidence: 0.92,
        endpoints: &["web-server-01", "db-server-02"],
        status: ActionStatus::Executed,
        hour: 11,
    },
    Seed {
        id: 0x0000_0000_0000_4000_8000_0000_0000_0001,
        policy_id: "POL-001",
        action_taken: "DISABLE_SMBv1",
        description: "EternalBlue exploitation attempt over SMBv1",
        confidence: 0.88,
        endpoints: &["file-server-01"],
        status: ActionStatus::Executed,
        hour: 10,
    },
];

impl Seed {
    fn to_action(&self) -> ComplianceAction {
        let mut action = ComplianceAction::new(self.policy_id, self.action_taken, self.confidence)
            .with_threat_description(Some(self.description.to_string()))
            .with_severity(Severity::Critical)
            .with_target_endpoints(self.endpoints.iter().copied());
        action.id = Uuid::from_u128(self.id);
        action.status = self.status;
        action.timestamp = Utc
            .with_ymd_and_hms(2024, 1, 15, self.hour, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        action
    }
}

/// The default set, newest first
pub fn default_actions() -> Vec<ComplianceAction> {
    SEEDS.iter().map(Seed::to_action).collect()
}
