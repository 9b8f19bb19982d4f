use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wps_api::config::{LogFormat, ServerConfig};
use wps_api::router::build_app_router;
use wps_api::state::AppState;
use wps_engine::processes::builtin::builtin_registry;
use wps_engine::processes::LocalExecutor;
use wps_engine::JobEngine;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");

    // --- Tracing ---
    init_tracing(config.log_format);
    tracing::info!(
        host = %config.host,
        port = %config.port,
        retention_secs = config.engine.result_retention.as_secs(),
        "Loaded server configuration",
    );

    // --- Job engine ---
    let registry = builtin_registry().expect("Failed to register built-in processes");
    tracing::info!(processes = registry.len(), "Process registry loaded");
    let executor = Arc::new(LocalExecutor::new(registry));
    let engine = Arc::new(JobEngine::new(executor, config.engine));

    // --- App state ---
    let state = AppState {
        engine: Arc::clone(&engine),
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cancelling jobs");
    engine.shutdown();

    let grace = Duration::from_secs(config.shutdown_grace_secs);
    if engine.wait_idle(grace).await {
        tracing::info!("Graceful shutdown complete");
    } else {
        tracing::warn!(
            in_flight = engine.in_flight(),
            grace_secs = config.shutdown_grace_secs,
            "Jobs still running after grace period, exiting anyway",
        );
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wps_api=debug,wps_engine=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
