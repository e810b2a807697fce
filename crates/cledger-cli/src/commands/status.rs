//! `cledger status` command implementation
//!
//! Shows server health.

use colored::Colorize;

use crate::api::{ApiClient, HealthStatus};
use crate::commands::to_json;
use crate::error::Result;
use crate::OutputFormat;

/// Show server health
pub async fn run(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => println!("{}", to_json(&health)?),
        OutputFormat::Table => print!("{}", render(client.base_url(), &health)),
    }

    Ok(())
}

fn render(server_url: &str, health: &HealthStatus) -> String {
    let status = if health.status == "healthy" {
        health.status.green().bold()
    } else {
        health.status.yellow().bold()
    };

    let mut out = String::new();
    out.push_str(&format!("{}\n", "Server:".cyan().bold()));
    out.push_str(&format!("  URL:         {}\n", server_url));
    out.push_str(&format!("  Status:      {}\n", status));
    out.push_str(&format!("  Ledger mode: {}\n", health.ledger_mode));
    out.push_str(&format!("  Index:       {}\n", health.index));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_degraded() {
        let out = render(
            "http://localhost:8000",
            &HealthStatus {
                status: "degraded".to_string(),
                ledger_mode: "local".to_string(),
                index: "unavailable".to_string(),
            },
        );
        assert!(out.contains("degraded"));
        assert!(out.contains("Index:       unavailable"));
        assert!(out.contains("URL:         http://localhost:8000"));
    }
}
