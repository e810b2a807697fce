//! Compliance Ledger Server - Main entry point

use anyhow::Result;
use cledger_common::logging::{init_logging, LogConfig};
use tracing::info;

use cledger_server::{api, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("cledger-server")
        .filter_directives("cledger_server=debug,tower_http=debug,sqlx=warn")
        .build();

    // Environment variables take precedence
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    let _guard = init_logging(&log_config)?;

    info!("Starting Compliance Ledger Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    api::serve(config).await?;

    Ok(())
}
