//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// All errors that can occur in the application are represented by this enum.
/// Each variant implements automatic conversion to HTTP responses via `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// The active tab requires inputs (URLs, documents, a database) that
    /// were not supplied; the query pipeline stops before any backend call
    #[error("No input provided: {0}")]
    NoInputProvided(String),

    /// The query or its memory configuration is invalid
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The underlying model, search, reader, or database service is
    /// unreachable or timed out
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Internal inconsistency while resetting session state on a tab
    /// switch; logged and swallowed, never surfaced to the user
    #[error("State reset failure: {0}")]
    StateResetFailure(String),

    /// Session with the given ID was not found
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Tab identifier outside the closed tab set
    #[error("Unknown tab: {0}")]
    UnknownTab(String),

    /// Uploaded blob could not be stored or read back
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NoInputProvided(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::InvalidQuery(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::BackendUnavailable(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::StateResetFailure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::SessionNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::UnknownTab(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_input_provided_maps_to_conflict() {
        let response = AppError::NoInputProvided("no URLs".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_invalid_query_maps_to_bad_request() {
        let response = AppError::InvalidQuery("empty".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_backend_unavailable_maps_to_bad_gateway() {
        let response = AppError::BackendUnavailable("timeout".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_session_not_found_maps_to_not_found() {
        let response = AppError::SessionNotFound("abc".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
