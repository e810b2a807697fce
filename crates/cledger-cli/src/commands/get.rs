//! `cledger get` command implementation

use uuid::Uuid;

use crate::api::{ApiClient, FetchedAction};
use crate::commands::{action_detail_table, to_json};
use crate::error::Result;
use crate::OutputFormat;

pub async fn run(client: &ApiClient, id: Uuid, format: OutputFormat) -> Result<()> {
    let fetched = client.get(id).await?;

    match format {
        OutputFormat::Json => println!("{}", to_json(&fetched)?),
        OutputFormat::Table => print!("{}", render(&fetched)),
    }

    Ok(())
}

fn render(fetched: &FetchedAction) -> String {
    format!(
        "{}\nServed from: {}\n",
        action_detail_table(&fetched.action),
        fetched.source
    )
}
