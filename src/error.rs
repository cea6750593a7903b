//! Error type shared by every handler.
//!
//! Each variant maps to one HTTP status and renders as `{"message": ...}`.
//! Upstream errors re-emit the backend's own JSON body and status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use crate::users::repo::RepoError;

pub const GENERIC_ERROR: &str = "Internal server error";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Backend answered with a non-success status.
    #[error("backend responded with {status}")]
    Upstream { status: StatusCode, body: Value },

    /// Logged in full, reported to the client as a generic message.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unauthenticated() -> Self {
        ApiError::Authentication("Unauthorized".into())
    }

    pub fn forbidden() -> Self {
        ApiError::Authorization("Forbidden".into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Upstream { body, .. } => (status, Json(body)).into_response(),
            ApiError::Internal(detail) => {
                error!(error = %detail, "internal error");
                (status, Json(json!({ "message": GENERIC_ERROR }))).into_response()
            }
            other => (status, Json(json!({ "message": other.to_string() }))).into_response(),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::DuplicateEmail => ApiError::Conflict("User with this email already exists".into()),
            RepoError::NotFound => ApiError::NotFound("User not found".into()),
            RepoError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}
