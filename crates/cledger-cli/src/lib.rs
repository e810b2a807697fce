//! cledger CLI Library
//!
//! Operator command-line interface for the compliance ledger server.
//!
//! # Overview
//!
//! - **Recording**: record a compliance action (`cledger record`)
//! - **Reading**: list and fetch actions (`cledger list`, `cledger get`)
//! - **Repair**: rebuild missing index rows from the ledger (`cledger reconcile`)
//! - **Inspection**: index counts and server health (`cledger stats`, `cledger status`)

pub mod api;
pub mod commands;
pub mod error;

// Re-export commonly used types
pub use error::{CliError, Result};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use api::client::{DEFAULT_API_TIMEOUT_SECS, DEFAULT_SERVER_URL};

/// cledger - Compliance action ledger
#[derive(Parser, Debug)]
#[command(name = "cledger")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Server URL
    #[arg(long, env = "CLEDGER_SERVER_URL", default_value = DEFAULT_SERVER_URL, global = true)]
    pub server_url: String,

    /// Request timeout in seconds
    #[arg(long, env = "CLEDGER_API_TIMEOUT_SECS", default_value_t = DEFAULT_API_TIMEOUT_SECS, global = true)]
    pub timeout_secs: u64,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a compliance action
    Record {
        /// Policy that motivated the action (e.g. POL-003)
        #[arg(long)]
        policy_id: String,

        /// Remediation performed (e.g. BLOCK_RDP_PORT)
        #[arg(long)]
        action_taken: String,

        /// Free-text rationale
        #[arg(long)]
        threat: Option<String>,

        /// Detection confidence in [0, 1]
        #[arg(long, allow_hyphen_values = true)]
        confidence: Option<f64>,

        /// LOW, MEDIUM, HIGH or CRITICAL
        #[arg(long)]
        severity: Option<String>,

        /// Target endpoint (repeatable)
        #[arg(long = "endpoint")]
        endpoints: Vec<String>,
    },

    /// List compliance actions, newest first
    List {
        /// PENDING, EXECUTED or FAILED
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        severity: Option<String>,

        #[arg(long)]
        policy_id: Option<String>,

        /// Substring match on policy, action and threat text
        #[arg(short, long)]
        query: Option<String>,

        /// Only actions at or after this RFC 3339 time
        #[arg(long)]
        since: Option<DateTime<Utc>>,

        /// Only actions at or before this RFC 3339 time
        #[arg(long)]
        until: Option<DateTime<Utc>>,

        #[arg(short, long)]
        limit: Option<i64>,

        #[arg(long)]
        offset: Option<i64>,
    },

    /// Show a single compliance action
    Get {
        /// Action id
        id: Uuid,
    },

    /// Rebuild missing or stale index rows from the ledger
    Reconcile,

    /// Show index counts by status
    Stats,

    /// Check server health
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_record() {
        let cli = Cli::try_parse_from([
            "cledger",
            "record",
            "--policy-id",
            "POL-003",
            "--action-taken",
            "BLOCK_RDP_PORT",
            "--confidence",
            "-0.2",
            "--endpoint",
            "srv-01",
            "--endpoint",
            "ws-02",
        ])
        .unwrap();

        match cli.command {
            Commands::Record {
                policy_id,
                confidence,
                endpoints,
                ..
            } => {
                assert_eq!(policy_id, "POL-003");
                assert_eq!(confidence, Some(-0.2));
                assert_eq!(endpoints, vec!["srv-01", "ws-02"]);
            },
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_list_with_global_flags() {
        let cli = Cli::try_parse_from([
            "cledger",
            "list",
            "--status",
            "EXECUTED",
            "--since",
            "2026-01-01T00:00:00Z",
            "--format",
            "json",
            "--server-url",
            "http://ledger:8000",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.server_url, "http://ledger:8000");
        assert!(matches!(
            cli.command,
            Commands::List { since: Some(_), .. }
        ));
    }

    #[test]
    fn test_get_requires_uuid() {
        assert!(Cli::try_parse_from(["cledger", "get", "not-a-uuid"]).is_err());
    }
}
