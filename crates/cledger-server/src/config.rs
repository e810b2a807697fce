//! Configuration management

use std::str::FromStr;
use std::time::Duration;

use cledger_common::types::{ConfidencePolicy, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use serde::{Deserialize, Serialize};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Ledger Configuration Constants
// ============================================================================

pub const DEFAULT_LEDGER_CHANNEL: &str = "compliance";

pub const DEFAULT_LEDGER_CHAINCODE: &str = "compliancecontract";

/// Per-call bound on every ledger request, in seconds.
pub const DEFAULT_LEDGER_TIMEOUT_SECS: u64 = 5;

/// Idle connections kept per gateway host.
pub const DEFAULT_LEDGER_MAX_CONNECTIONS: usize = 16;

/// Entries requested per page when scanning the ledger.
pub const DEFAULT_LEDGER_PAGE_SIZE: u32 = 100;

// ============================================================================
// Index Configuration Constants
// ============================================================================

/// In-memory SQLite keeps the service usable without any database.
pub const DEFAULT_INDEX_DATABASE_URL: &str = "sqlite::memory:";

pub const DEFAULT_INDEX_MAX_CONNECTIONS: u32 = 10;

pub const DEFAULT_INDEX_MIN_CONNECTIONS: u32 = 0;

pub const DEFAULT_INDEX_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Per-call bound on every index query, in seconds.
pub const DEFAULT_INDEX_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Enforcement Configuration Constants
// ============================================================================

pub const DEFAULT_ANSIBLE_PATH: &str = "/ansible";

pub const DEFAULT_ENFORCEMENT_TIMEOUT_SECS: u64 = 30;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    pub index: IndexConfig,
    pub enforcement: EnforcementConfig,
    pub compliance: ComplianceConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Ledger gateway configuration
///
/// The network ledger is only attempted when both `gateway_url` and
/// `api_token` are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub gateway_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub channel: String,
    pub chaincode: String,
    pub timeout_secs: u64,
    pub max_connections: usize,
    pub page_size: u32,
}

/// Secondary index database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    #[default]
    Log,
    Webhook,
    Ansible,
}

impl FromStr for EnforcementMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" | "" => Ok(Self::Log),
            "webhook" => Ok(Self::Webhook),
            "ansible" => Ok(Self::Ansible),
            other => Err(anyhow::anyhow!("Invalid enforcement mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementConfig {
    pub mode: EnforcementMode,
    pub webhook_url: Option<String>,
    pub ansible_path: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceConfig {
    pub confidence_policy: ConfidencePolicy,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    env_string(name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: env_string("CLEDGER_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
                port: env_parse("CLEDGER_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_parse(
                    "CLEDGER_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            ledger: LedgerConfig {
                gateway_url: env_string("LEDGER_GATEWAY_URL"),
                api_token: env_string("LEDGER_API_TOKEN"),
                channel: env_string("LEDGER_CHANNEL")
                    .unwrap_or_else(|| DEFAULT_LEDGER_CHANNEL.to_string()),
                chaincode: env_string("LEDGER_CHAINCODE")
                    .unwrap_or_else(|| DEFAULT_LEDGER_CHAINCODE.to_string()),
                timeout_secs: env_parse("LEDGER_TIMEOUT_SECS", DEFAULT_LEDGER_TIMEOUT_SECS),
                max_connections: env_parse(
                    "LEDGER_MAX_CONNECTIONS",
                    DEFAULT_LEDGER_MAX_CONNECTIONS,
                ),
                page_size: env_parse("LEDGER_PAGE_SIZE", DEFAULT_LEDGER_PAGE_SIZE),
            },
            index: IndexConfig {
                url: env_string("INDEX_DATABASE_URL")
                    .or_else(|| env_string("DATABASE_URL"))
                    .unwrap_or_else(|| DEFAULT_INDEX_DATABASE_URL.to_string()),
                max_connections: env_parse(
                    "INDEX_MAX_CONNECTIONS",
                    DEFAULT_INDEX_MAX_CONNECTIONS,
                ),
                min_connections: env_parse(
                    "INDEX_MIN_CONNECTIONS",
                    DEFAULT_INDEX_MIN_CONNECTIONS,
                ),
                connect_timeout_secs: env_parse(
                    "INDEX_CONNECT_TIMEOUT_SECS",
                    DEFAULT_INDEX_CONNECT_TIMEOUT_SECS,
                ),
                timeout_secs: env_parse("INDEX_TIMEOUT_SECS", DEFAULT_INDEX_TIMEOUT_SECS),
                default_page_size: env_parse("INDEX_DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE),
                max_page_size: env_parse("INDEX_MAX_PAGE_SIZE", MAX_PAGE_SIZE),
            },
            enforcement: EnforcementConfig {
                mode: env_string("ENFORCEMENT_MODE")
                    .map(|s| s.parse())
                    .transpose()?
                    .unwrap_or_default(),
                webhook_url: env_string("ENFORCEMENT_WEBHOOK_URL"),
                ansible_path: env_string("ANSIBLE_PATH")
                    .unwrap_or_else(|| DEFAULT_ANSIBLE_PATH.to_string()),
                timeout_secs: env_parse(
                    "ENFORCEMENT_TIMEOUT_SECS",
                    DEFAULT_ENFORCEMENT_TIMEOUT_SECS,
                ),
            },
            compliance: ComplianceConfig {
                confidence_policy: env_string("COMPLIANCE_CONFIDENCE_POLICY")
                    .map(|s| s.parse::<ConfidencePolicy>())
                    .transpose()?
                    .unwrap_or_default(),
            },
            cors: CorsConfig {
                allowed_origins: env_string("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_parse("CORS_ALLOW_CREDENTIALS", true),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.ledger.timeout_secs == 0 {
            anyhow::bail!("LEDGER_TIMEOUT_SECS must be greater than 0");
        }

        if self.ledger.page_size == 0 {
            anyhow::bail!("LEDGER_PAGE_SIZE must be greater than 0");
        }

        if self.ledger.gateway_url.is_some() != self.ledger.api_token.is_some() {
            tracing::warn!(
                "Only one of LEDGER_GATEWAY_URL / LEDGER_API_TOKEN is set - the local ledger will be used"
            );
        }

        if self.index.url.is_empty() {
            anyhow::bail!("Index database URL cannot be empty");
        }

        if self.index.max_connections == 0 {
            anyhow::bail!("INDEX_MAX_CONNECTIONS must be greater than 0");
        }

        if self.index.min_connections > self.index.max_connections {
            anyhow::bail!(
                "INDEX_MIN_CONNECTIONS ({}) cannot be greater than INDEX_MAX_CONNECTIONS ({})",
                self.index.min_connections,
                self.index.max_connections
            );
        }

        if self.index.timeout_secs == 0 {
            anyhow::bail!("INDEX_TIMEOUT_SECS must be greater than 0");
        }

        if self.index.max_page_size < 1 {
            anyhow::bail!("INDEX_MAX_PAGE_SIZE must be at least 1");
        }

        if self.index.default_page_size < 1 || self.index.default_page_size > self.index.max_page_size
        {
            anyhow::bail!(
                "INDEX_DEFAULT_PAGE_SIZE ({}) must be between 1 and INDEX_MAX_PAGE_SIZE ({})",
                self.index.default_page_size,
                self.index.max_page_size
            );
        }

        if self.enforcement.mode == EnforcementMode::Webhook && self.enforcement.webhook_url.is_none()
        {
            anyhow::bail!("ENFORCEMENT_MODE=webhook requires ENFORCEMENT_WEBHOOK_URL");
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl LedgerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl IndexConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl EnforcementConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            ledger: LedgerConfig {
                gateway_url: None,
                api_token: None,
                channel: DEFAULT_LEDGER_CHANNEL.to_string(),
                chaincode: DEFAULT_LEDGER_CHAINCODE.to_string(),
                timeout_secs: DEFAULT_LEDGER_TIMEOUT_SECS,
                max_connections: DEFAULT_LEDGER_MAX_CONNECTIONS,
                page_size: DEFAULT_LEDGER_PAGE_SIZE,
            },
            index: IndexConfig {
                url: DEFAULT_INDEX_DATABASE_URL.to_string(),
                max_connections: DEFAULT_INDEX_MAX_CONNECTIONS,
                min_connections: DEFAULT_INDEX_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_INDEX_CONNECT_TIMEOUT_SECS,
                timeout_secs: DEFAULT_INDEX_TIMEOUT_SECS,
                default_page_size: DEFAULT_PAGE_SIZE,
                max_page_size: MAX_PAGE_SIZE,
            },
            enforcement: EnforcementConfig {
                mode: EnforcementMode::Log,
                webhook_url: None,
                ansible_path: DEFAULT_ANSIBLE_PATH.to_string(),
                timeout_secs: DEFAULT_ENFORCEMENT_TIMEOUT_SECS,
            },
            compliance: ComplianceConfig {
                confidence_policy: ConfidencePolicy::Clamp,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "CLEDGER_PORT",
        "LEDGER_GATEWAY_URL",
        "LEDGER_API_TOKEN",
        "INDEX_DATABASE_URL",
        "DATABASE_URL",
        "ENFORCEMENT_MODE",
        "ENFORCEMENT_WEBHOOK_URL",
        "COMPLIANCE_CONFIDENCE_POLICY",
        "INDEX_DEFAULT_PAGE_SIZE",
        "INDEX_MAX_PAGE_SIZE",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.index.url, "sqlite::memory:");
        assert_eq!(config.ledger.channel, "compliance");
        assert_eq!(config.ledger.chaincode, "compliancecontract");
        assert_eq!(config.compliance.confidence_policy, ConfidencePolicy::Clamp);
    }

    #[test]
    #[serial]
    fn test_load_reads_environment() {
        clear_env();
        std::env::set_var("CLEDGER_PORT", "9100");
        std::env::set_var("LEDGER_GATEWAY_URL", "http://gateway:7000");
        std::env::set_var("LEDGER_API_TOKEN", "secret");
        std::env::set_var("COMPLIANCE_CONFIDENCE_POLICY", "reject");
        std::env::set_var("DATABASE_URL", "postgres://localhost/cledger");

        let config = Config::load().unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.ledger.gateway_url.as_deref(), Some("http://gateway:7000"));
        assert_eq!(config.compliance.confidence_policy, ConfidencePolicy::Reject);
        assert_eq!(config.index.url, "postgres://localhost/cledger");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_index_url_takes_precedence() {
        clear_env();
        std::env::set_var("DATABASE_URL", "postgres://localhost/other");
        std::env::set_var("INDEX_DATABASE_URL", "sqlite://index.db");

        let config = Config::load().unwrap();
        assert_eq!(config.index.url, "sqlite://index.db");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_webhook_mode_requires_url() {
        clear_env();
        std::env::set_var("ENFORCEMENT_MODE", "webhook");
        assert!(Config::load().is_err());

        std::env::set_var("ENFORCEMENT_WEBHOOK_URL", "http://hooks.local/enforce");
        let config = Config::load().unwrap();
        assert_eq!(config.enforcement.mode, EnforcementMode::Webhook);

        clear_env();
    }

    #[test]
    fn test_page_size_bounds_validated() {
        let mut config = Config::default();
        config.index.default_page_size = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_token_not_serialized() {
        let mut config = Config::default();
        config.ledger.api_token = Some("secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
