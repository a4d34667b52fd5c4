//! Error types for the service facade.
//!
//! [`ApiError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use registrar_db::DbError;

/// Errors that can occur in the service facade.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested row does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A student with this email already exists.
    #[error("Email already registered")]
    DuplicateEmail,

    /// The record store rejected the write (foreign key, uniqueness, check).
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// The request body is not well-formed JSON for the target type.
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// The request body failed validation.
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// An invalid path or query parameter was provided.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::DuplicateEmail(_) => Self::DuplicateEmail,
            DbError::Integrity(msg) => Self::Integrity(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateEmail | Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::Integrity(_) => StatusCode::CONFLICT,
            Self::InvalidBody(_) | Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_errors_map_to_api_errors() {
        assert!(matches!(
            ApiError::from(DbError::DuplicateEmail(String::from("a@b.c"))),
            ApiError::DuplicateEmail
        ));
        assert!(matches!(
            ApiError::from(DbError::Integrity(String::from("fk"))),
            ApiError::Integrity(_)
        ));
        assert!(matches!(
            ApiError::from(DbError::Config(String::from("bad"))),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn status_codes() {
        let cases = [
            (ApiError::NotFound(String::from("Student not found")), 404),
            (ApiError::DuplicateEmail, 400),
            (ApiError::InvalidQuery(String::from("limit")), 400),
            (ApiError::Integrity(String::from("fk")), 409),
            (ApiError::InvalidBody(String::from("EOF")), 422),
            (ApiError::Internal(String::from("boom")), 500),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status().as_u16(), expected);
        }
    }

    #[test]
    fn not_found_message_is_verbatim() {
        let err = ApiError::NotFound(String::from("Course not found"));
        assert_eq!(err.to_string(), "Course not found");
    }
}
