//! Per-request state threaded through the pipeline stages.

use chrono::{DateTime, Utc};
use vsight_analytics::ShapingContext;
use vsight_engine_client::{EngineEndpoint, ImagePayload};
use vsight_models::{
    AnalyzeOptions, Capability, CapabilitySet, ChipTarget, DayPeriod, DetectionKind, DetectionSet,
    RawOptions, TamperingDecision, ViewConfig,
};

/// Which analysis route the request came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Alarm,
    Chip,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Alarm => "alarm",
            RequestKind::Chip => "chip",
        }
    }

    pub fn endpoint(&self) -> EngineEndpoint {
        match self {
            RequestKind::Alarm => EngineEndpoint::Analysis,
            RequestKind::Chip => EngineEndpoint::Chip,
        }
    }

    /// JSON body field carrying image URLs.
    pub fn url_field(&self) -> &'static str {
        match self {
            RequestKind::Alarm => "analysisImageUrls",
            RequestKind::Chip => "chipUrls",
        }
    }

    /// Resource type reported in the response envelope.
    pub fn resource_type(&self) -> &'static str {
        match self {
            RequestKind::Alarm => "alarm-analysis",
            RequestKind::Chip => "chip-analysis",
        }
    }
}

/// Raw request as received by a handler.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub kind: RequestKind,
    pub view_id: String,
    pub request_id: String,
    pub options: RawOptions,
    pub images: ImagePayload,
}

/// Scene change bookkeeping for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct TamperingState {
    /// Decision reached for the request.
    pub decision: TamperingDecision,
    /// Decision actually sent to the engine.
    pub sent: TamperingDecision,
    /// Store the request image as the reference for this period.
    pub save_reference: Option<DayPeriod>,
    /// Record the engine's verdict in the event log once it answers.
    pub record_outcome: bool,
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub kind: RequestKind,
    pub request_id: String,
    pub view: ViewConfig,
    pub options: AnalyzeOptions,
    pub detections: DetectionSet,
    /// The single selected chip detection (chip requests only).
    pub chip_target: Option<ChipTarget>,
    pub images: ImagePayload,
    pub capabilities: CapabilitySet,
    /// Set by the capability gate when on-demand tampering is not allowed.
    pub gated_tampering: Option<TamperingDecision>,
    pub tampering: Option<TamperingState>,
    pub now: DateTime<Utc>,
}

impl RequestContext {
    pub fn view_id(&self) -> &str {
        &self.view.id
    }

    pub fn shaping_context(&self) -> ShapingContext {
        ShapingContext {
            vehicle_embeddings: self.capabilities.contains(Capability::VehicleEmbeddings),
            person_embeddings: self.capabilities.contains(Capability::PersonEmbeddings),
            face_configured: self.detections.contains(DetectionKind::Face),
        }
    }

    /// Detection names for logs and records.
    pub fn detection_names(&self) -> Vec<String> {
        self.detections.kinds().map(|kind| kind.to_string()).collect()
    }
}
