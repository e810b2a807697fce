//! Ansible enforcer
//!
//! Maps the action code to a playbook under `<ansible_path>/playbooks`, writes
//! a JSON inventory of the target endpoints to a temporary file and runs
//! `ansible-playbook` against it.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use cledger_common::types::ComplianceAction;
use serde_json::{json, Map, Value};
use tokio::process::Command;
use tracing::{debug, info};

use super::{EnforcementError, EnforcementReport, Enforcer};

const DEFAULT_PROGRAM: &str = "ansible-playbook";

/// Playbook file for an action code, if one exists
pub fn playbook_for(action_taken: &str) -> Option<&'static str> {
    match action_taken {
        "DISABLE_SMBv1" => Some("disable_smbv1.yml"),
        "UPDATE_FIREWALL" | "BLOCK_RDP_PORT" | "ENABLE_FIREWALL" => Some("update_firewall.yml"),
        "ISOLATE_ENDPOINT" => Some("isolate_endpoint.yml"),
        _ => None,
    }
}

/// Inventory with endpoints grouped into `servers` and `workstations`
pub fn build_inventory<'a>(endpoints: impl IntoIterator<Item = &'a String>) -> Value {
    let mut servers = Map::new();
    let mut workstations = Map::new();

    for endpoint in endpoints {
        let host = json!({ "ansible_host": endpoint });
        if endpoint.to_lowercase().contains("server") {
            servers.insert(endpoint.clone(), host);
        } else {
            workstations.insert(endpoint.clone(), host);
        }
    }

    json!({
        "all": {
            "children": {
                "servers": { "hosts": servers },
                "workstations": { "hosts": workstations }
            }
        }
    })
}

pub struct AnsibleEnforcer {
    base_path: PathBuf,
    program: String,
}

impl AnsibleEnforcer {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            program: DEFAULT_PROGRAM.to_string(),
        }
    }

    /// Run a different executable in place of `ansible-playbook`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn playbook_path(&self, playbook: &str) -> PathBuf {
        self.base_path.join("playbooks").join(playbook)
    }
}

#[async_trait]
impl Enforcer for AnsibleEnforcer {
    fn name(&self) -> &'static str {
        "ansible"
    }

    async fn enforce(
        &self,
        action: &ComplianceAction,
    ) -> Result<EnforcementReport, EnforcementError> {
        let Some(playbook) = playbook_for(&action.action_taken) else {
            return Ok(EnforcementReport::Skipped {
                reason: format!("no playbook mapped for {}", action.action_taken),
            });
        };

        if action.target_endpoints.is_empty() {
            return Ok(EnforcementReport::Skipped {
                reason: "no target endpoints".to_string(),
            });
        }

        let inventory = build_inventory(&action.target_endpoints);
        let inventory_file = tempfile::Builder::new()
            .prefix("cledger-inventory-")
            .suffix(".json")
            .tempfile()?;
        tokio::fs::write(inventory_file.path(), serde_json::to_vec_pretty(&inventory)?).await?;

        let extra_vars = json!({
            "action_id": action.id,
            "threat_description": action.threat_description.clone().unwrap_or_default(),
            "target_hosts": ["servers", "workstations"],
        });

        let playbook_path = self.playbook_path(playbook);
        info!(
            action_id = %action.id,
            playbook = %playbook_path.display(),
            hosts = action.target_endpoints.len(),
            "Running enforcement playbook"
        );

        let output = Command::new(&self.program)
            .arg("-i")
            .arg(inventory_file.path())
            .arg(&playbook_path)
            .arg("--extra-vars")
            .arg(extra_vars.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(EnforcementError::PlaybookFailed {
                playbook: playbook.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(stdout = %String::from_utf8_lossy(&output.stdout), "Playbook output");
        Ok(EnforcementReport::Executed {
            detail: format!("{} completed", playbook),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn rdp_action() -> ComplianceAction {
        ComplianceAction::new("POL-003", "BLOCK_RDP_PORT", 0.9)
            .with_target_endpoints(["web-server-01", "ws-07"])
    }

    #[test]
    fn test_playbook_mapping() {
        assert_eq!(playbook_for("DISABLE_SMBv1"), Some("disable_smbv1.yml"));
        assert_eq!(playbook_for("BLOCK_RDP_PORT"), Some("update_firewall.yml"));
        assert_eq!(playbook_for("ENABLE_FIREWALL"), Some("update_firewall.yml"));
        assert_eq!(playbook_for("UPDATE_FIREWALL"), Some("update_firewall.yml"));
        assert_eq!(playbook_for("ISOLATE_ENDPOINT"), Some("isolate_endpoint.yml"));
        assert_eq!(playbook_for("REBOOT"), None);
    }

    #[test]
    fn test_inventory_groups_hosts() {
        let action = rdp_action();
        let inventory = build_inventory(&action.target_endpoints);
        let children = &inventory["all"]["children"];

        assert_eq!(
            children["servers"]["hosts"]["web-server-01"]["ansible_host"],
            "web-server-01"
        );
        assert_eq!(children["workstations"]["hosts"]["ws-07"]["ansible_host"], "ws-07");
        assert!(children["servers"]["hosts"].get("ws-07").is_none());
    }

    #[tokio::test]
    async fn test_unmapped_action_is_skipped() {
        let enforcer = AnsibleEnforcer::new("/ansible");
        let action = ComplianceAction::new("POL-010", "REBOOT", 0.5).with_target_endpoints(["ws-1"]);
        let report = enforcer.enforce(&action).await.unwrap();
        assert!(matches!(report, EnforcementReport::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_no_endpoints_is_skipped() {
        let enforcer = AnsibleEnforcer::new("/ansible");
        let action = ComplianceAction::new("POL-001", "DISABLE_SMBv1", 0.5);
        let report = enforcer.enforce(&action).await.unwrap();
        assert!(matches!(report, EnforcementReport::Skipped { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_run_is_executed() {
        let enforcer = AnsibleEnforcer::new("/ansible").with_program("true");
        let report = enforcer.enforce(&rdp_action()).await.unwrap();
        assert_eq!(
            report,
            EnforcementReport::Executed {
                detail: "update_firewall.yml completed".to_string()
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_run_is_error() {
        let enforcer = AnsibleEnforcer::new("/ansible").with_program("false");
        let err = enforcer.enforce(&rdp_action()).await.unwrap_err();
        assert!(matches!(
            err,
            EnforcementError::PlaybookFailed { code: Some(1), .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let enforcer =
            AnsibleEnforcer::new("/ansible").with_program("cledger-no-such-ansible-binary");
        let err = enforcer.enforce(&rdp_action()).await.unwrap_err();
        assert!(matches!(err, EnforcementError::Io(_)));
    }
}
