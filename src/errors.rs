use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("notification not found")]
    NotFound,

    #[error("invalid recipient")]
    InvalidRecipient,

    #[error("invalid request body: {0}")]
    InvalidRequestBody(String),

    #[error("invalid identity")]
    InvalidIdentity,

    #[error("authentication required")]
    Unauthorized,

    #[error("storage unavailable")]
    StorageUnavailable,

    #[error("storage operation failed")]
    StorageOperationFailed,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(inner) => {
                tracing::error!("Storage unavailable: {}", inner);
                AppError::StorageUnavailable
            }
            StoreError::Operation(inner) => {
                tracing::error!("Storage error: {}", inner);
                AppError::StorageOperationFailed
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "not_found_error",
                "notification_not_found",
                "Notification not found".to_string(),
            ),
            AppError::InvalidRecipient => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_recipient",
                "Invalid recipient".to_string(),
            ),
            AppError::InvalidRequestBody(reason) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_request_body",
                reason.clone(),
            ),
            AppError::InvalidIdentity => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "invalid_identity",
                "Authentication required".to_string(),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "unauthorized",
                "Authentication required".to_string(),
            ),
            AppError::StorageUnavailable | AppError::StorageOperationFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal_server_error",
                "Internal server error".to_string(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}
