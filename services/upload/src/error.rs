//! Custom error types for the upload service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure of the synchronous phase of an upload
#[derive(Error, Debug)]
pub enum UploadError {
    /// Required request fields are missing
    #[error("{0}")]
    Validation(String),

    /// The initial write of the media record failed
    #[error("Failed to store media record: {0}")]
    Storage(#[from] StoreError),
}

/// Custom error type for the HTTP layer
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upload handling failed
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::BadRequest(msg) | ApiError::Upload(UploadError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, msg)
            }
            ApiError::Upload(UploadError::Storage(e)) => {
                error!("Failed to store media record: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process media upload".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
