//! Collaborator services the pipeline depends on.
//!
//! Each concern is a narrow async trait so the pipeline can run against the
//! platform REST API in production and against in-memory stores in tests.

pub mod error;
pub mod memory;
pub mod platform;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use vsight_analytics::AnalysisResult;
use vsight_models::{
    Capability, CapabilitySet, DayPeriod, ReferencePair, TamperingEvent, ViewConfig,
};

use crate::pipeline::response::SceneChange;

pub use error::{ServiceError, ServiceResult};
pub use platform::PlatformClient;

/// Camera view configuration lookup.
#[async_trait]
pub trait ViewDirectory: Send + Sync {
    async fn view(&self, view_id: &str) -> ServiceResult<Option<ViewConfig>>;
}

#[async_trait]
pub trait CapabilityService: Send + Sync {
    async fn company_capabilities(&self, company_id: &str) -> ServiceResult<CapabilitySet>;

    /// Subset of `required` the company does not hold.
    async fn missing_capabilities(
        &self,
        company_id: &str,
        required: &[Capability],
    ) -> ServiceResult<Vec<Capability>>;
}

/// Reference images and the event log of scene change checks.
#[async_trait]
pub trait TamperingStore: Send + Sync {
    async fn references(&self, view_id: &str) -> ServiceResult<ReferencePair>;

    async fn save_reference(&self, view_id: &str, period: DayPeriod, image_id: &str) -> ServiceResult<()>;

    async fn events_since(&self, view_id: &str, since: DateTime<Utc>) -> ServiceResult<Vec<TamperingEvent>>;

    async fn record_event(&self, event: &TamperingEvent) -> ServiceResult<()>;
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store an image and return its id.
    async fn upload(&self, key: &str, data: Bytes, content_type: &str) -> ServiceResult<String>;

    async fn fetch(&self, url: &str) -> ServiceResult<Bytes>;
}

/// Analytics history.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn persist(&self, record: &AnalysisRecord) -> ServiceResult<()>;
}

/// Stored outcome of one analysis request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub request_id: String,
    pub kind: &'static str,
    pub view_id: String,
    pub camera_id: String,
    pub company_id: String,
    pub detections: Vec<String>,
    pub result: AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_change: Option<SceneChange>,
    pub created_at: DateTime<Utc>,
}

/// Collaborator handles injected into the pipeline.
#[derive(Clone)]
pub struct Services {
    pub views: Arc<dyn ViewDirectory>,
    pub capabilities: Arc<dyn CapabilityService>,
    pub tampering: Arc<dyn TamperingStore>,
    pub images: Arc<dyn ImageStore>,
    pub analytics: Arc<dyn AnalyticsSink>,
}

impl Services {
    /// All collaborators backed by one platform client.
    pub fn platform(client: PlatformClient) -> Self {
        let client = Arc::new(client);
        Self {
            views: client.clone(),
            capabilities: client.clone(),
            tampering: client.clone(),
            images: client.clone(),
            analytics: client,
        }
    }
}
