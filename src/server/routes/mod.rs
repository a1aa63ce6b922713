//! API route handlers
//!
//! - `health`: liveness, readiness, metrics and metadata
//! - `matching`: ranked matches and cache management
//! - `profiles`: subject and candidate upserts

pub mod health;
pub mod matching;
pub mod profiles;

use axum::Json;
use axum::response::IntoResponse;
use serde_json::json;

use crate::server::error::{ServerError, ServerResult};

/// API version and base info
///
/// # Response
///
/// ```json
/// {
///   "name": "mentormatch",
///   "version": "0.1.0",
///   "api_version": "v1",
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "mentormatch",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "GET /api/v1/matches/{subject_id}",
            "DELETE /api/v1/matches/{subject_id}",
            "DELETE /api/v1/matches",
            "POST /api/v1/matches/{subject_id}/warm",
            "GET /api/v1/cache/stats",
            "PUT /api/v1/subjects/{subject_id}",
            "PUT /api/v1/candidates/{candidate_id}",
            "GET /health",
            "GET /ready",
            "GET /metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
