//! HTTP surface
//!
//! [`build_context`] wires the backends together once at startup,
//! [`create_router`] mounts the feature routes with the middleware stack and
//! [`serve`] runs the server until a shutdown signal arrives.

pub mod response;

use std::net::SocketAddr;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::enforcement::EnforcementTrigger;
use crate::error::{ServerError, ServerResult};
use crate::features::{self, ComplianceContext, ComplianceSettings};
use crate::{index, ledger, middleware};

/// Select the ledger, open the index and configure enforcement
///
/// An index whose migrations fail is kept: reads fall back past it and
/// writes report it as a degraded step.
pub async fn build_context(config: &Config) -> ServerResult<ComplianceContext> {
    let ledger = ledger::select_backend(&config.ledger).await;

    let index = index::connect(&config.index).await?;
    match index.migrate().await {
        Ok(()) => info!(backend = index.backend(), "Index migrations completed"),
        Err(e) => warn!(
            backend = index.backend(),
            error = %e,
            "Index migrations failed, continuing with a degraded index"
        ),
    }

    let enforcement = EnforcementTrigger::from_config(&config.enforcement)?;

    Ok(ComplianceContext {
        ledger,
        index,
        enforcement,
        settings: ComplianceSettings::from_config(config),
    })
}

pub async fn serve(config: Config) -> ServerResult<()> {
    let ctx = build_context(&config).await?;
    let index = ctx.index.clone();
    let app = create_router(ctx, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| ServerError::config(format!("Invalid bind address: {}", e)))?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    index.close().await;
    info!("Server shut down gracefully");

    Ok(())
}

/// Create the application router with all routes and middleware
pub fn create_router(ctx: ComplianceContext, config: &Config) -> Router {
    let feature_routes = features::router(ctx.clone());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .with_state(ctx)
        .nest("/api/v1", feature_routes)
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Compliance Ledger Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Health check handler
///
/// Always 200: the service keeps answering reads and writes with the index
/// down, so an unreachable index only marks the status as degraded.
async fn health_check(State(ctx): State<ComplianceContext>) -> impl IntoResponse {
    let probe = tokio::time::timeout(ctx.settings.index_timeout, ctx.index.health_check()).await;
    let index_ok = matches!(probe, Ok(Ok(())));

    if !index_ok {
        warn!(backend = ctx.index.backend(), "Index health check failed");
    }

    Json(json!({
        "status": if index_ok { "healthy" } else { "degraded" },
        "ledgerMode": ctx.ledger.mode(),
        "index": if index_ok { "connected" } else { "unavailable" },
    }))
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
