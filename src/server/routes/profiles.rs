use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::profile::{CandidateProfile, SubjectProfile};
use crate::server::error::{ServerError, ServerResult};
use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub id: String,
    pub created: bool,
    /// Whether a cached ranking was dropped by this write
    pub invalidated: bool,
}

fn check_id(path_id: &str, body_id: &str) -> ServerResult<()> {
    if body_id.is_empty() || body_id == path_id {
        Ok(())
    } else {
        Err(ServerError::BadRequest(format!(
            "body id `{body_id}` does not match path id `{path_id}`"
        )))
    }
}

fn status_for(created: bool) -> StatusCode {
    if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

/// Create or replace a student profile and drop its cached ranking.
pub async fn upsert_subject(
    State(state): State<Arc<AppState>>,
    Path(subject_id): Path<String>,
    body: Result<Json<SubjectProfile>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(mut subject) = body?;
    check_id(&subject_id, &subject.id)?;
    subject.id = subject_id.clone();

    let created = !state.profiles.upsert_subject(subject);
    let invalidated = state.cache.invalidate(&subject_id);
    tracing::info!(subject_id = %subject_id, created, invalidated, "subject profile upserted");

    Ok((
        status_for(created),
        Json(UpsertResponse {
            id: subject_id,
            created,
            invalidated,
        }),
    ))
}

/// Create or replace a mentor profile.
///
/// Cached rankings that include this mentor stay until they expire.
pub async fn upsert_candidate(
    State(state): State<Arc<AppState>>,
    Path(candidate_id): Path<String>,
    body: Result<Json<CandidateProfile>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(mut candidate) = body?;
    check_id(&candidate_id, &candidate.id)?;
    candidate.id = candidate_id.clone();

    let created = !state.profiles.upsert_candidate(candidate);
    tracing::info!(candidate_id = %candidate_id, created, "candidate profile upserted");

    Ok((
        status_for(created),
        Json(UpsertResponse {
            id: candidate_id,
            created,
            invalidated: false,
        }),
    ))
}
