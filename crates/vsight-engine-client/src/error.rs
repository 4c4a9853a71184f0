//! Engine client error types.

use thiserror::Error;
use vsight_analytics::ShapeError;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine rejected the submitted images (HTTP 422).
    #[error("Invalid images: {0}")]
    InvalidImages(String),

    #[error("Engine returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Multipart error: {0}")]
    Multipart(#[from] multer::Error),

    #[error("Unexpected reply shape: {0}")]
    Shape(#[from] ShapeError),
}

impl EngineError {
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Only transport failures are retried; the engine answering with an
    /// error status never is.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Network(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// Label used for the failure counter.
    pub fn reason(&self) -> &'static str {
        match self {
            EngineError::InvalidImages(_) => "invalid_images",
            EngineError::Upstream { .. } => "upstream_status",
            EngineError::InvalidResponse(_) => "invalid_response",
            EngineError::Network(e) if e.is_timeout() => "timeout",
            EngineError::Network(_) => "network",
            EngineError::Json(_) => "json",
            EngineError::Multipart(_) => "multipart",
            EngineError::Shape(_) => "shape",
        }
    }
}
