use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::{MatchError, StoreError};

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServerError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Match(MatchError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Match(MatchError::Validation(_)) => StatusCode::BAD_REQUEST,
            ServerError::Match(MatchError::Collaborator(_)) => StatusCode::BAD_GATEWAY,
            ServerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Authentication(_) => "AUTH_FAILED",
            ServerError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Match(MatchError::NotFound(_)) => "SUBJECT_NOT_FOUND",
            ServerError::Match(MatchError::Validation(_)) => "VALIDATION_ERROR",
            ServerError::Match(MatchError::Collaborator(_)) => "COLLABORATOR_ERROR",
            ServerError::Store(_) => "STORAGE_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServerError::Match(MatchError::Validation(message.into()))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        }

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
            },
        });

        (status, body).into_response()
    }
}

impl From<QueryRejection> for ServerError {
    fn from(err: QueryRejection) -> Self {
        ServerError::validation(err.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(err: PathRejection) -> Self {
        ServerError::BadRequest(err.body_text())
    }
}

impl From<JsonRejection> for ServerError {
    fn from(err: JsonRejection) -> Self {
        ServerError::BadRequest(err.body_text())
    }
}
