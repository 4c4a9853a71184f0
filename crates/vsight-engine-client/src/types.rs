//! Engine request/response types.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use vsight_analytics::AnalysisResult;
use vsight_models::DetectionSet;

/// Engine endpoint a request is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEndpoint {
    /// Full-frame alarm images.
    Analysis,
    /// Pre-cropped chips.
    Chip,
}

impl EngineEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            EngineEndpoint::Analysis => "/analysis",
            EngineEndpoint::Chip => "/chip",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineEndpoint::Analysis => "analysis",
            EngineEndpoint::Chip => "chip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRef {
    pub id: String,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraRef {
    pub id: String,
    pub view_id: String,
}

/// Options document sent alongside the images.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOptions {
    pub request_id: String,
    pub site: SiteRef,
    pub company: CompanyRef,
    pub camera: CameraRef,
    pub detections: DetectionSet,
}

/// One uploaded image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl ImageBuffer {
    pub fn jpeg(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content_type: "image/jpeg".to_string(),
            data: data.into(),
        }
    }
}

/// Images are either uploaded inline or referenced by URL.
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePayload {
    Buffers(Vec<ImageBuffer>),
    Urls(Vec<String>),
}

impl ImagePayload {
    pub fn len(&self) -> usize {
        match self {
            ImagePayload::Buffers(buffers) => buffers.len(),
            ImagePayload::Urls(urls) => urls.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub endpoint: EngineEndpoint,
    pub options: EngineOptions,
    pub images: ImagePayload,
}

/// JSON body used when images are passed by URL.
#[derive(Debug, Serialize)]
pub(crate) struct UrlRequestBody<'a> {
    pub options: &'a EngineOptions,
    pub images: &'a [String],
}

/// Image returned by the engine (annotated or cropped).
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyImage {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Shaped engine reply.
#[derive(Debug, Clone)]
pub struct EngineReply {
    pub result: AnalysisResult,
    pub images: Vec<ReplyImage>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: Option<String>,
}
