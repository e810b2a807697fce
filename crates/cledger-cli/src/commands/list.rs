//! `cledger list` command implementation

use colored::Colorize;

use cledger_common::types::ActionFilter;

use crate::api::{ActionList, ApiClient};
use crate::commands::{actions_table, to_json};
use crate::error::Result;
use crate::OutputFormat;

/// List actions matching `filter`
pub async fn run(client: &ApiClient, filter: ActionFilter, format: OutputFormat) -> Result<()> {
    let list = client.list(&filter).await?;

    match format {
        OutputFormat::Json => println!("{}", to_json(&list)?),
        OutputFormat::Table => print!("{}", render(&list)),
    }

    Ok(())
}

fn render(list: &ActionList) -> String {
    let mut out = String::new();

    if list.items.is_empty() {
        out.push_str("No compliance actions found.\n");
    } else {
        out.push_str(&format!("{}\n", actions_table(&list.items)));
    }

    let footer = format!(
        "Showing {} action(s) from {} (offset {}, limit {})",
        list.pagination.returned, list.source, list.pagination.offset, list.pagination.limit
    );
    if list.source == "defaults" {
        out.push_str(&format!("{}\n", footer.yellow()));
        out.push_str("Ledger and index are unavailable; these are built-in sample actions.\n");
    } else {
        out.push_str(&format!("{}\n", footer));
    }
    out
}
