//! Pipeline stage errors.

use thiserror::Error;
use vsight_engine_client::EngineError;
use vsight_models::Capability;

use crate::services::ServiceError;

pub type PipelineResult<T> = Result<T, PipelineError>;

fn join_capabilities(capabilities: &[Capability]) -> String {
    capabilities
        .iter()
        .map(Capability::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("View {0} not found")]
    ViewNotFound(String),

    /// Request shape or options rejected before reaching the engine.
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Company is missing required capabilities: {}", join_capabilities(.0))]
    MissingCapabilities(Vec<Capability>),

    /// The engine refused the images.
    #[error("{0}")]
    InvalidImages(String),

    #[error("Analysis engine failure: {0}")]
    Engine(EngineError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl PipelineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Metric label of the stage that stopped the request.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::ViewNotFound(_) => "view",
            PipelineError::InvalidRequest(_) => "validation",
            PipelineError::MissingCapabilities(_) => "capability",
            PipelineError::InvalidImages(_) | PipelineError::Engine(_) => "engine",
            PipelineError::Service(_) => "service",
        }
    }
}

impl From<EngineError> for PipelineError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidImages(msg) => PipelineError::InvalidImages(msg),
            other => PipelineError::Engine(other),
        }
    }
}
