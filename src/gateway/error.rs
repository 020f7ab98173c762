//! HTTP error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::backend::BackendError;
use crate::pipeline::PipelineError;

use super::payload::ErrorResponse;

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body failed validation. 422.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A pipeline failure. Mapped per the backend taxonomy.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Pipeline(PipelineError::Backend(BackendError::RateLimited { .. })) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Pipeline(PipelineError::Backend(BackendError::Unavailable { .. })) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Pipeline(PipelineError::Embedding(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}
