//! Axum HTTP API server for camera image analysis.
//!
//! This crate provides:
//! - Alarm and chip analysis endpoints backed by the analysis pipeline
//! - Collaborator traits with REST and in-memory implementations
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{ApiConfig, PlatformConfig, TamperingSettings};
pub use error::{ApiError, ApiResult};
pub use pipeline::{AnalysisEnvelope, AnalysisInput, AnalysisPipeline, PipelineError, RequestKind};
pub use routes::create_router;
pub use services::Services;
pub use state::AppState;
