//! cledger CLI - Main entry point

use std::process;
use std::time::Duration;

use clap::Parser;
use cledger_cli::api::{ApiClient, RecordActionRequest};
use cledger_cli::{commands, Cli, CliError, Commands};
use cledger_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use cledger_common::types::ActionFilter;
use tracing::error;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Verbose mode logs debug to the console, otherwise only warnings
    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        })
        .output(LogOutput::Console)
        .log_file_prefix("cledger-cli".to_string())
        .build();

    // An explicit LOG_LEVEL switches to full environment configuration
    let log_config = if std::env::var_os("LOG_LEVEL").is_some() {
        LogConfig::from_env().unwrap_or(log_config)
    } else {
        log_config
    };

    // The CLI works without logging
    let _guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn execute_command(cli: &Cli) -> cledger_cli::Result<()> {
    if cli.timeout_secs == 0 {
        return Err(CliError::config("--timeout-secs must be greater than zero"));
    }
    let client = ApiClient::new(&cli.server_url, Duration::from_secs(cli.timeout_secs))?;

    match &cli.command {
        Commands::Record {
            policy_id,
            action_taken,
            threat,
            confidence,
            severity,
            endpoints,
        } => {
            let request = RecordActionRequest {
                policy_id: policy_id.clone(),
                action_taken: action_taken.clone(),
                threat_description: threat.clone(),
                confidence: *confidence,
                severity: severity.clone(),
                target_endpoints: endpoints.clone(),
            };
            commands::record::run(&client, request, cli.format).await
        },

        Commands::List {
            status,
            severity,
            policy_id,
            query,
            since,
            until,
            limit,
            offset,
        } => {
            let filter = ActionFilter {
                status: status.clone(),
                severity: severity.clone(),
                policy_id: policy_id.clone(),
                q: query.clone(),
                since: *since,
                until: *until,
                limit: *limit,
                offset: *offset,
            };
            commands::list::run(&client, filter, cli.format).await
        },

        Commands::Get { id } => commands::get::run(&client, *id, cli.format).await,

        Commands::Reconcile => commands::reconcile::run(&client, cli.format).await,

        Commands::Stats => commands::stats::run(&client, cli.format).await,

        Commands::Status => commands::status::run(&client, cli.format).await,
    }
}
