//! Server initialization and routing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post, put};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::server::config::{DEMO_API_KEY, ServerConfig};
use crate::server::middleware::{api_key_auth, log_requests, request_id};
use crate::server::routes::{api_info, health, matching, not_found, profiles};
use crate::server::state::AppState;

const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Build the Axum router with all routes and middleware.
///
/// `/`, `/health`, `/ready` and `/metrics` are public; everything under
/// `/api/v1` goes through [`api_key_auth`]. The outermost layer assigns the
/// request id so request logging can see it.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let public_routes = Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics));

    let protected_routes = Router::new()
        .route("/api/v1/matches", delete(matching::clear_matches))
        .route(
            "/api/v1/matches/{subject_id}",
            get(matching::get_matches).delete(matching::invalidate_matches),
        )
        .route(
            "/api/v1/matches/{subject_id}/warm",
            post(matching::warm_matches),
        )
        .route("/api/v1/cache/stats", get(matching::cache_stats))
        .route("/api/v1/subjects/{subject_id}", put(profiles::upsert_subject))
        .route(
            "/api/v1/candidates/{candidate_id}",
            put(profiles::upsert_candidate),
        )
        .route("/api/v1/metadata", get(health::server_metadata))
        .layer(from_fn_with_state(state.clone(), api_key_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(cors)
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Install JSON logging filtered by `log_level`.
///
/// A subscriber that is already installed is left in place.
pub fn init_tracing(log_level: &str) {
    let result = tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .try_init();

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Install the global Prometheus recorder backing `/metrics`.
pub fn install_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let upkeep = handle.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(METRICS_UPKEEP_INTERVAL);
        loop {
            interval.tick().await;
            upkeep.run_upkeep();
        }
    });

    Ok(handle)
}

/// Start the mentormatch HTTP server.
///
/// Blocks until SIGTERM or Ctrl+C, then drains in-flight requests.
///
/// # Example
///
/// ```rust,no_run
/// use mentormatch::server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     mentormatch::server::start_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    init_tracing(&config.log_level);
    if config.uses_demo_key() {
        tracing::warn!("No API keys configured, using demo key '{DEMO_API_KEY}'");
    }

    let mut state = AppState::new(config.clone())?;
    if config.metrics_enabled {
        state = state.with_metrics(install_metrics()?);
    }
    let state = Arc::new(state);

    let app = build_router(state.clone());
    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        addr = %addr,
        api_keys = config.api_keys.len(),
        subjects = state.profiles.subject_count(),
        candidates = state.profiles.candidate_count(),
        "starting mentormatch server"
    );
    tracing::info!(
        ttl_secs = config.cache.ttl_secs,
        default_limit = config.cache.default_limit,
        durable_tier = config.storage.snapshot_path.as_deref().unwrap_or("in-memory"),
        "match cache configured"
    );
    tracing::info!(
        timeout_secs = config.timeout_secs,
        max_body_kb = config.max_body_size_kb,
        rate_limit_per_minute = config.rate_limit_per_minute,
        cors = config.enable_cors,
        metrics = config.metrics_enabled,
        "http settings"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
