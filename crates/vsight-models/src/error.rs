//! Model parsing errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Unknown detection: {0}")]
    UnknownDetection(String),

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Invalid embeddings version: {0}")]
    InvalidEmbeddingsVersion(String),

    #[error("Invalid time of day (expected HH:MM): {0}")]
    InvalidClockTime(String),
}
