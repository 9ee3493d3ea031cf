//! RoadHelp Dispatcher: realtime help-request fan-out and acceptance authority
//!
//! Main entry point that loads configuration, starts the realtime engine,
//! and serves the WebSocket endpoint.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use roadhelp_core::config::{AppConfig, DispatchConfig};
use roadhelp_core::error::AppError;
use roadhelp_realtime::RealtimeEngine;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Dispatcher error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("ROADHELP_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.is_json() {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Main dispatcher run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting RoadHelp dispatcher v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Realtime engine ──────────────────────────────────
    let engine = RealtimeEngine::new(config.realtime.clone());

    // ── Step 2: Retire stale and settled requests ────────────────
    if let Some(timeout) = config.dispatch.pending_timeout() {
        tracing::info!(
            timeout_secs = timeout.as_secs(),
            "Pending request expiry enabled"
        );
    }
    spawn_pruner(engine.clone(), config.dispatch.clone());

    // ── Step 3: Router ───────────────────────────────────────────
    let app = roadhelp_realtime::http::router(engine.clone());

    // ── Step 4: Bind and serve ───────────────────────────────────
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| AppError::configuration(format!("Invalid server address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("RoadHelp dispatcher listening on {}", addr);

    // ── Step 5: Graceful shutdown ────────────────────────────────
    let mut stopping = engine.shutdown_receiver();
    let shutdown_engine = engine.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        shutdown_engine.shutdown();
    });
    let mut server = tokio::spawn(server.into_future());

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    tokio::select! {
        result = &mut server => server_result(result)?,
        _ = stopping.recv() => match tokio::time::timeout(grace, &mut server).await {
            Ok(result) => server_result(result)?,
            Err(_) => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Connections still open after grace period, forcing exit"
                );
                server.abort();
            }
        },
    }

    tracing::info!("RoadHelp dispatcher stopped");
    Ok(())
}

/// Flatten the server task result
fn server_result(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    result
        .map_err(|e| AppError::internal(format!("Server task failed: {}", e)))?
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))
}

/// Periodically forgets unaccepted requests past the pending timeout and
/// matched requests past the retention window.
fn spawn_pruner(engine: RealtimeEngine, dispatch: DispatchConfig) {
    let retention = dispatch.settled_retention();
    let pending = dispatch.pending_timeout();
    let sweep = pending.map_or(retention, |timeout| timeout.min(retention));

    let mut shutdown = engine.shutdown_receiver();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = chrono::Utc::now();
                    if let Some(cutoff) = pending.and_then(|timeout| cutoff_before(now, timeout)) {
                        let pruned = engine.coordinator.prune_unaccepted(cutoff);
                        if pruned > 0 {
                            tracing::info!(pruned = pruned, "Expired unaccepted help requests");
                        }
                    }
                    if let Some(cutoff) = cutoff_before(now, retention) {
                        let pruned = engine.coordinator.prune_settled(cutoff);
                        if pruned > 0 {
                            tracing::debug!(pruned = pruned, "Retired settled help requests");
                        }
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    });
}

/// `now - age`, or `None` when that is out of range.
fn cutoff_before(
    now: chrono::DateTime<chrono::Utc>,
    age: Duration,
) -> Option<chrono::DateTime<chrono::Utc>> {
    let age = chrono::Duration::from_std(age).ok()?;
    now.checked_sub_signed(age)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
