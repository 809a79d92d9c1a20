//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.
//!
//! Schema validation errors reach the client in full; payload and execution
//! errors get a fixed message and the cause only goes to the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::dto::MessageResponse;
use crate::auth::AuthError;
use crate::error::ErrorClass;
use crate::ingest::IngestError;
use crate::query::QueryError;

pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or missing access token.";
pub const INVALID_LOGIN_MESSAGE: &str = "Invalid login credentials.";
pub const INVALID_CSV_MESSAGE: &str = "Invalid csv file provided.";
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON body provided.";
pub const SEARCH_FAILED_MESSAGE: &str = "Invalid search parameters provided.";
pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to store sensor readings.";

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing, unknown or expired bearer token
    #[error("Unauthorized: {0}")]
    Unauthorized(AuthError),

    /// Login rejected
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// Body could not be read; the message is sent to the client as is
    #[error("Invalid payload: {0}")]
    Payload(&'static str),

    /// Search request failed
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Upload failed
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Error class of the underlying failure
    pub fn class(&self) -> ErrorClass {
        match self {
            ApiError::Unauthorized(_) | ApiError::InvalidCredentials => ErrorClass::Auth,
            ApiError::Payload(_) => ErrorClass::Payload,
            ApiError::Query(e) => e.class(),
            ApiError::Ingest(e) => e.class(),
            ApiError::Internal(_) | ApiError::Io(_) => ErrorClass::Execution,
        }
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, INVALID_TOKEN_MESSAGE.into()),
            ApiError::InvalidCredentials => (StatusCode::FORBIDDEN, INVALID_LOGIN_MESSAGE.into()),
            ApiError::Payload(message) => (StatusCode::BAD_REQUEST, (*message).to_string()),
            ApiError::Query(e) => match e.class() {
                ErrorClass::SchemaValidation => (StatusCode::BAD_REQUEST, e.to_string()),
                ErrorClass::Execution => {
                    (StatusCode::INTERNAL_SERVER_ERROR, SEARCH_FAILED_MESSAGE.into())
                }
                _ => (StatusCode::BAD_REQUEST, INVALID_JSON_MESSAGE.into()),
            },
            ApiError::Ingest(e @ IngestError::BatchTooLarge { .. }) => {
                (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
            }
            ApiError::Ingest(e) => match e.class() {
                ErrorClass::SchemaValidation => (StatusCode::BAD_REQUEST, e.to_string()),
                ErrorClass::Execution => {
                    (StatusCode::INTERNAL_SERVER_ERROR, UPLOAD_FAILED_MESSAGE.into())
                }
                _ => (StatusCode::BAD_REQUEST, INVALID_CSV_MESSAGE.into()),
            },
            ApiError::Internal(_) | ApiError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error.".into(),
            ),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::Internal(message) => ApiError::Internal(message),
            other => ApiError::Unauthorized(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let request_id = uuid::Uuid::new_v4().to_string();
        let class = self.class();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_class = %class,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                error_class = %class,
                error_message = %self,
                "Request rejected"
            );
        }

        (status, Json(MessageResponse::new(message))).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Column, StorageError};

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (AuthError::InvalidToken.into(), StatusCode::UNAUTHORIZED),
            (AuthError::InvalidCredentials.into(), StatusCode::FORBIDDEN),
            (
                AuthError::Internal("bad cost".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::Payload(INVALID_JSON_MESSAGE), StatusCode::BAD_REQUEST),
            (
                QueryError::EmptyPredicate(Column::Humidity).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                QueryError::ExecutionFailed(StorageError::Lock("poisoned".into())).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                IngestError::BatchTooLarge { rows: 10, max: 5 }.into(),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_execution_errors_hide_cause() {
        let err: ApiError = IngestError::Storage(StorageError::Lock("poisoned".into())).into();
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, UPLOAD_FAILED_MESSAGE);

        let err: ApiError = QueryError::InvalidRequest("found array".into()).into();
        assert_eq!(err.status_and_message().1, INVALID_JSON_MESSAGE);
    }

    #[test]
    fn test_validation_errors_are_detailed() {
        let err: ApiError = IngestError::InvalidEnum {
            line: 4,
            value: "X".into(),
        }
        .into();
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.starts_with("Line 4: 'X'"));
    }
}
