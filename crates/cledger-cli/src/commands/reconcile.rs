//! `cledger reconcile` command implementation
//!
//! Asks the server to copy ledger records the index is missing or behind on.

use colored::Colorize;

use crate::api::{ApiClient, ReconcileReport};
use crate::commands::{new_table, to_json};
use crate::error::Result;
use crate::OutputFormat;

pub async fn run(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report = client.reconcile().await?;

    match format {
        OutputFormat::Json => println!("{}", to_json(&report)?),
        OutputFormat::Table => print!("{}", render(&report)),
    }

    Ok(())
}

fn render(report: &ReconcileReport) -> String {
    let mut table = new_table();
    table.set_header(vec!["Scanned", "Inserted", "Advanced", "Conflicts", "Skipped"]);
    table.add_row(vec![
        report.scanned.to_string(),
        report.inserted.to_string(),
        report.advanced.to_string(),
        report.conflicts.to_string(),
        report.skipped.to_string(),
    ]);

    let headline = if report.conflicts > 0 {
        "Reconcile finished with conflicts".yellow().bold()
    } else {
        "Reconcile finished".green().bold()
    };

    format!("{}\n{}\n", headline, table)
}
