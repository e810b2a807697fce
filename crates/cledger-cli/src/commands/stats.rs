//! `cledger stats` command implementation

use colored::Colorize;

use crate::api::{ApiClient, ComplianceStats};
use crate::commands::{new_table, to_json};
use crate::error::Result;
use crate::OutputFormat;

pub async fn run(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let stats = client.stats().await?;

    match format {
        OutputFormat::Json => println!("{}", to_json(&stats)?),
        OutputFormat::Table => print!("{}", render(&stats)),
    }

    Ok(())
}

fn render(stats: &ComplianceStats) -> String {
    let mut table = new_table();
    table.set_header(vec!["Status", "Actions"]);
    for (status, count) in &stats.by_status {
        table.add_row(vec![status.clone(), count.to_string()]);
    }

    let mut out = String::new();
    out.push_str(&format!("{}\n", "Compliance Index:".cyan().bold()));
    out.push_str(&format!("  Ledger mode:     {}\n", stats.ledger_mode));
    out.push_str(&format!("  Indexed actions: {}\n\n", stats.indexed_actions));
    out.push_str(&format!("{}\n", table));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_stats() {
        let mut by_status = BTreeMap::new();
        by_status.insert("EXECUTED".to_string(), 3);
        by_status.insert("FAILED".to_string(), 1);

        let out = render(&ComplianceStats {
            ledger_mode: "network".to_string(),
            indexed_actions: 4,
            by_status,
        });

        assert!(out.contains("Ledger mode:     network"));
        assert!(out.contains("Indexed actions: 4"));
        assert!(out.contains("EXECUTED"));
    }
}
