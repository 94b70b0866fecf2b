// ABOUTME: Maps request failures to HTTP responses.
// ABOUTME: Deploy failures become 400 with the error message as plain text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::deploy::DeployError;

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or wrong bearer token.
    #[error("Not Authorized")]
    Unauthorized,

    /// The request body could not be read (too large, bad multipart, ...).
    #[error("{message}")]
    Body { status: StatusCode, message: String },

    /// The deploy pipeline rejected or failed the upload.
    #[error(transparent)]
    Deploy(#[from] DeployError),

    /// The deploy task itself died.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Body { status, .. } => *status,
            ApiError::Deploy(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
