//! Custom error types for the API service

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::repositories::StoreError;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// No identity where the operation requires one
    #[error("You need to be logged in!")]
    Unauthenticated,

    /// Login failure; identical for unknown user and wrong password
    #[error("Incorrect credentials")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Uniqueness violation on registration
    #[error("{0}")]
    Conflict(String),

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payments are not configured")]
    PaymentUnavailable,

    #[error("Payment processor error: {0}")]
    Payment(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => ApiError::Conflict(err.to_string()),
            StoreError::UnknownUser => ApiError::Unauthenticated,
            StoreError::Database(e) => ApiError::Database(e),
        }
    }
}

// Extractor rejections keep the JSON error shape instead of axum's plain text.

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PaymentUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Payment(_) => StatusCode::BAD_GATEWAY,
            ApiError::InternalServerError | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            ApiError::Database(e) => {
                tracing::error!("Database failure: {}", e);
                "Database error".to_string()
            }
            ApiError::Payment(ref detail) => {
                tracing::error!("Payment processor failure: {}", detail);
                "Payment processor error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_failures_share_status_and_message() {
        assert_eq!(ApiError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidCredentials.to_string(), "Incorrect credentials");
    }

    #[test]
    fn test_store_conflict_becomes_conflict() {
        let err: ApiError = StoreError::Conflict {
            field: "email".to_string(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "email is already taken");
    }

    #[test]
    fn test_unknown_user_is_unauthenticated() {
        let err: ApiError = StoreError::UnknownUser.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "You need to be logged in!");
    }

    #[test]
    fn test_not_found_names_the_record() {
        let err = ApiError::NotFound("Palette");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Palette not found");
    }
}
