//! Compliance Ledger Server Library
//!
//! HTTP server recording automated compliance actions on a tamper-evident
//! ledger, mirrored into a relational index for fast reads.
//!
//! # Overview
//!
//! - **Ledger**: authoritative store, either a permissioned network ledger
//!   reached over its REST gateway or a local simulation
//! - **Index**: PostgreSQL or SQLite copy of every action for filtered reads
//! - **Enforcement**: best-effort trigger fired after every record
//! - **Configuration**: Environment-based configuration management
//! - **Middleware**: CORS and request logging
//!
//! # Architecture
//!
//! The server follows a **CQRS (Command Query Responsibility Segregation)** architecture:
//!
//! - **Commands** (Write Operations): record an action, reconcile the index
//!   - Executed via HTTP POST
//!   - Writes are best effort after validation; each step reports its own outcome
//!
//! - **Queries** (Read Operations): list, get, stats
//!   - Executed via HTTP GET
//!   - Reads fall back from the ledger to the index to built-in defaults
//!
//! ## Framework Stack
//!
//! - **Axum**: Modern, ergonomic web framework
//! - **SQLx**: Async SQL for the index
//! - **Reqwest**: HTTP client for the ledger gateway and webhooks
//! - **Tower HTTP**: CORS, tracing and compression layers
//!
//! # Example
//!
//! ```no_run
//! use cledger_server::{api, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     api::serve(config).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod enforcement;
pub mod error;
pub mod features;
pub mod index;
pub mod ledger;
pub mod middleware;

// Re-export commonly used types
pub use error::{ServerError, ServerResult};
pub use features::{ComplianceContext, ComplianceSettings};
