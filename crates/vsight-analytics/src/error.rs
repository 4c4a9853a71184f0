//! Error types for response shaping.

use thiserror::Error;

pub type ShapeResult<T> = Result<T, ShapeError>;

#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("engine reply is not a JSON object")]
    NotAnObject,

    #[error("engine reply field '{field}' must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}

impl ShapeError {
    pub fn invalid_field(field: &'static str, expected: &'static str) -> Self {
        Self::InvalidField { field, expected }
    }
}
