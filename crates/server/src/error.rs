use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use commander::CommandError;
use thiserror::Error;

use crate::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Not Found: {0}")]
    NotFound(String),
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Command(CommandError::ConfigError(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "ConfigError")
            }
            ApiError::Command(CommandError::InvalidRequest(_)) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest")
            }
            ApiError::Command(CommandError::DatabaseError(_)) | ApiError::Database(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError")
            }
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = self.status();
        if status_code.is_server_error() {
            tracing::error!("{}: {}", error_type, self);
        }

        let error_message = match &self {
            ApiError::Command(CommandError::ConfigError(msg)) => msg.clone(),
            ApiError::Command(CommandError::InvalidRequest(msg)) => msg.clone(),
            ApiError::NotFound(msg) => msg.clone(),
            // Store errors stay in the log; callers get the category only.
            _ => format!("{}: the data store is unavailable", error_type),
        };
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
