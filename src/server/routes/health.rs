use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde_json::json;

use crate::server::error::ServerResult;
use crate::server::state::{AppState, ServerMetadata};

/// Health check endpoint (liveness)
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "mentormatch",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime().as_secs(),
    }))
}

/// Readiness check endpoint
///
/// Ready once the profile store has at least one candidate to rank.
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let subjects = state.profiles.subject_count();
    let candidates = state.profiles.candidate_count();
    let ready = candidates > 0;

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if ready { "ready" } else { "not_ready" },
            "service": "mentormatch",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "uptime_seconds": state.uptime().as_secs(),
            "components": {
                "profiles": { "subjects": subjects, "candidates": candidates },
                "cache": { "entries": state.cache.stats().entries },
            }
        })),
    )
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = match (&state.metrics, state.config.metrics_enabled) {
        (Some(handle), true) => handle.render(),
        _ => String::new(),
    };

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

/// Server metadata endpoint (authenticated)
pub async fn server_metadata(
    State(state): State<Arc<AppState>>,
) -> ServerResult<impl IntoResponse> {
    Ok(Json(ServerMetadata {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime().as_secs(),
    }))
}
