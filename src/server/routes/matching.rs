use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::profile::MatchResult;
use crate::server::error::{ServerError, ServerResult};
use crate::server::state::AppState;

/// Query string of `GET /api/v1/matches/{subject_id}`
#[derive(Debug, Default, Deserialize)]
pub struct MatchQuery {
    /// Page size; falls back to `cache.default_limit`
    #[serde(default)]
    pub limit: Option<i64>,

    /// Bypass a live cache entry and recompute
    #[serde(default)]
    pub refresh: bool,
}

/// Match response
#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub subject_id: String,
    pub limit: usize,
    pub refreshed: bool,
    pub total_matches: usize,
    pub matches: Vec<RankedMatch>,
}

/// One ranked mentor, 1-based rank
#[derive(Debug, Serialize)]
pub struct RankedMatch {
    pub rank: usize,
    #[serde(flatten)]
    pub result: MatchResult,
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub subject_id: String,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub removed: usize,
}

#[derive(Debug, Serialize)]
pub struct WarmResponse {
    pub subject_id: String,
    pub warmed: bool,
}

fn resolve_limit(requested: Option<i64>, default_limit: usize) -> ServerResult<usize> {
    match requested {
        None => Ok(default_limit),
        Some(limit) if limit <= 0 => Err(ServerError::validation(format!(
            "limit must be a positive integer, got {limit}"
        ))),
        Some(limit) => usize::try_from(limit)
            .map_err(|_| ServerError::validation(format!("limit {limit} is out of range"))),
    }
}

/// Ranked mentors for a student, served from the cache when live.
pub async fn get_matches(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<MatchQuery>, QueryRejection>,
) -> ServerResult<impl IntoResponse> {
    let Path(subject_id) = path?;
    let Query(query) = query?;
    let limit = resolve_limit(query.limit, state.default_limit())?;

    let results = state
        .cache
        .get_matches(&subject_id, limit, query.refresh)
        .await?;

    let matches: Vec<RankedMatch> = results
        .into_iter()
        .enumerate()
        .map(|(i, result)| RankedMatch { rank: i + 1, result })
        .collect();

    Ok(Json(MatchesResponse {
        subject_id,
        limit,
        refreshed: query.refresh,
        total_matches: matches.len(),
        matches,
    }))
}

/// Drop one subject's fast-tier entry.
pub async fn invalidate_matches(
    State(state): State<Arc<AppState>>,
    Path(subject_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let removed = state.cache.invalidate(&subject_id);
    Ok(Json(InvalidateResponse {
        subject_id,
        removed,
    }))
}

/// Drop every fast-tier entry.
pub async fn clear_matches(State(state): State<Arc<AppState>>) -> ServerResult<impl IntoResponse> {
    let removed = state.cache.clear_all();
    Ok(Json(ClearResponse { removed }))
}

/// Reload a live durable snapshot into the fast tier.
pub async fn warm_matches(
    State(state): State<Arc<AppState>>,
    Path(subject_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let warmed = state.cache.warm(&subject_id).await?;
    Ok(Json(WarmResponse { subject_id, warmed }))
}

pub async fn cache_stats(State(state): State<Arc<AppState>>) -> ServerResult<impl IntoResponse> {
    Ok(Json(state.cache.stats()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_limit() {
        assert_eq!(resolve_limit(None, 10).unwrap(), 10);
        assert_eq!(resolve_limit(Some(3), 10).unwrap(), 3);
        assert!(resolve_limit(Some(0), 10).is_err());
        assert!(resolve_limit(Some(-4), 10).is_err());
    }
}
