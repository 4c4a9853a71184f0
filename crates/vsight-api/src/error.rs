//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::pipeline::PipelineError;
use crate::services::ServiceError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The analysis engine rejected the images.
    #[error("Invalid images: {0}")]
    InvalidImages(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Analysis engine error: {0}")]
    Engine(String),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::InvalidImages(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Engine(_) | ApiError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Forbidden(_) => Some("missing_capabilities"),
            ApiError::InvalidImages(_) => Some("invalid_images"),
            ApiError::Engine(_) => Some("analysis_failed"),
            _ => None,
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, ApiError::Engine(_) | ApiError::Service(_))
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::ViewNotFound(view_id) => ApiError::NotFound(format!("View {}", view_id)),
            PipelineError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            err @ PipelineError::MissingCapabilities(_) => ApiError::Forbidden(err.to_string()),
            PipelineError::InvalidImages(msg) => ApiError::InvalidImages(msg),
            PipelineError::Engine(e) => ApiError::Engine(e.to_string()),
            PipelineError::Service(e) => ApiError::Service(e),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if self.is_internal() {
            error!(error = %self, "Request failed");
            if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                "An internal error occurred".to_string()
            } else {
                self.to_string()
            }
        } else {
            match &self {
                // The engine's message is passed through as is.
                ApiError::InvalidImages(msg) => msg.clone(),
                _ => self.to_string(),
            }
        };

        let body = ErrorResponse {
            detail,
            code: self.code().map(str::to_string),
        };

        (status, Json(body)).into_response()
    }
}
