//! Client for the external image analysis engine.
//!
//! Images go up either as multipart buffers or as a JSON list of URLs,
//! together with an options document naming the detections to run. Replies
//! come back as JSON or as multipart (`info` plus annotated `images`) and
//! are shaped through `vsight-analytics` before being returned.

pub mod client;
pub mod error;
pub mod metrics;
pub mod types;

pub use client::{AnalysisEngine, EngineClient, EngineConfig, REQUEST_ID_HEADER};
pub use error::{EngineError, EngineResult};
pub use types::{
    CameraRef, CompanyRef, EngineEndpoint, EngineOptions, EngineReply, EngineRequest,
    HealthResponse, ImageBuffer, ImagePayload, ReplyImage, SiteRef,
};
