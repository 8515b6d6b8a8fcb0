//! Auth Service
//!
//! Single-binary Rust service that:
//! 1. Registers users and checks passwords against the user directory
//! 2. Issues short-lived access tokens backed by server-side sessions
//! 3. Rotates sessions on refresh, revoking on a mismatched refresh token
//! 4. Answers gRPC ValidateToken calls from other services on an internal listener

mod api;
mod config;
mod error;
mod metrics;
mod password;
mod rpc;
mod users;

use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth_token::TokenService;
use session_store::{MemorySessionStore, RedisSessionStore, SessionStore, TimeoutStore};

use crate::api::ApiState;
use crate::config::{Config, StoreBackend};
use crate::users::{MemoryUserDirectory, PgUserDirectory, UserDirectory};

/// How long in-flight requests get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// State for the operational endpoints on the public listener.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn SessionStore>,
    started_at: Instant,
    prometheus: PrometheusHandle,
}

/// Public listener: `/auth/*`, `/health`, `/metrics`.
///
/// Token validation is not routed here; it lives on the internal gRPC
/// listener only.
///
/// The concurrency limit queues excess requests rather than rejecting them.
fn build_public_router(api: ApiState, app: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(app)
        .merge(api::build_api_router(api))
        .layer(axum::middleware::from_fn(metrics::track_requests))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting auth-service");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    let explicit_path = cli_config_path.is_some() || std::env::var_os("CONFIG_PATH").is_some();

    let config = if explicit_path || config_path.exists() {
        info!(path = %config_path.display(), "loading configuration");
        Config::load(&config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?
    } else {
        info!("no config file found, using defaults and environment");
        Config::from_env_defaults().context("invalid configuration from environment")?
    };

    info!(
        http_addr = %config.http.listen_addr,
        rpc_addr = %config.rpc.listen_addr,
        store_backend = ?config.session_store.backend,
        store_timeout_ms = config.session_store.store_timeout_ms,
        "configuration loaded"
    );

    let key = config
        .signing_key()
        .context("failed to load signing key")?;

    let backend: Arc<dyn SessionStore> = match config.session_store.backend {
        StoreBackend::Redis => {
            let url = config
                .session_store
                .redis_url
                .as_deref()
                .context("redis backend requires redis_url")?;
            Arc::new(
                RedisSessionStore::connect(url)
                    .await
                    .context("failed to connect to Redis")?,
            )
        }
        StoreBackend::Memory => {
            warn!("using in-memory session store, sessions will not survive a restart");
            Arc::new(MemorySessionStore::new())
        }
    };
    let store: Arc<dyn SessionStore> = Arc::new(TimeoutStore::new(
        backend,
        Duration::from_millis(config.session_store.store_timeout_ms),
    ));
    store
        .ping()
        .await
        .context("session store did not answer ping")?;
    info!(backend = store.backend(), "session store ready");

    let users: Arc<dyn UserDirectory> = match &config.users.database_url {
        Some(url) => Arc::new(
            PgUserDirectory::connect(url.expose())
                .await
                .context("failed to connect to user database")?,
        ),
        None => {
            warn!("no database_url configured, using in-memory user directory");
            Arc::new(MemoryUserDirectory::new())
        }
    };

    let tokens = Arc::new(TokenService::new(key, store.clone()));
    let app_state = AppState {
        store,
        started_at: Instant::now(),
        prometheus: prometheus_handle,
    };

    let public_app = build_public_router(
        ApiState {
            tokens: tokens.clone(),
            users,
        },
        app_state,
        config.http.max_connections,
    );

    let public_listener = TcpListener::bind(config.http.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.http.listen_addr))?;
    let internal_listener = TcpListener::bind(config.rpc.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.rpc.listen_addr))?;

    info!(
        http_addr = %config.http.listen_addr,
        rpc_addr = %config.rpc.listen_addr,
        "accepting requests"
    );

    // The drain timeout starts when the shutdown signal fires, not when the
    // servers start.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut public_server = tokio::spawn(serve(public_listener, public_app, shutdown_rx.clone()));
    let mut internal_server = tokio::spawn(rpc::serve(
        internal_listener,
        tokens,
        wait_for_shutdown(shutdown_rx),
    ));

    tokio::select! {
        _ = shutdown_signal() => {}
        result = &mut public_server => {
            anyhow::bail!("public listener stopped unexpectedly: {result:?}");
        }
        result = &mut internal_server => {
            anyhow::bail!("internal listener stopped unexpectedly: {result:?}");
        }
    }

    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(DRAIN_TIMEOUT, async {
        tokio::join!(public_server, internal_server)
    })
    .await
    {
        Ok((public, internal)) => {
            report_stopped("public", public);
            report_stopped("internal", internal);
            info!("all in-flight requests drained");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Serve until the shutdown flag flips, then drain.
async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown))
        .await
}

/// Resolves once the shutdown flag is set (or the sender is gone).
async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Log how a listener task ended after shutdown.
fn report_stopped<E: Display>(listener: &str, result: Result<Result<(), E>, JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(listener, error = %e, "server error during shutdown"),
        Err(e) => error!(listener, error = %e, "server task panicked"),
    }
}

/// Returns 200 when the session store answers a ping, 503 otherwise.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.started_at.elapsed().as_secs();

    let (status_code, status, reachable) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "healthy", true),
        Err(e) => {
            warn!(error = %e, "health check: session store unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", false)
        }
    };

    let body = serde_json::json!({
        "status": status,
        "session_store": state.store.backend(),
        "session_store_reachable": reachable,
        "uptime_seconds": uptime,
    });

    (
        status_code,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
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
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
