//! Shared fixtures for the API integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use serde_json::{json, Value};
use tower::ServiceExt;
use vsight_analytics::{normalize, ShapingContext};
use vsight_api::services::memory::MemoryServices;
use vsight_api::{create_router, AnalysisPipeline, ApiConfig, AppState, TamperingSettings};
use vsight_engine_client::{AnalysisEngine, EngineError, EngineReply, EngineRequest, EngineResult};
use vsight_models::{Capability, ViewConfig};

pub const BOUNDARY: &str = "vsight-test-boundary";

/// 2024-03-01 12:00 in Madrid: day, after the default check window.
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap()
}

enum Behavior {
    Reply(Value),
    Reject(String),
    Fail(u16),
}

/// Analysis engine double that records every request it receives.
pub struct FakeEngine {
    behavior: Mutex<Behavior>,
    requests: Mutex<Vec<EngineRequest>>,
    healthy: bool,
}

impl FakeEngine {
    pub fn replying(raw: Value) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(Behavior::Reply(raw)),
            requests: Mutex::new(Vec::new()),
            healthy: true,
        })
    }

    pub fn rejecting(message: &str) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(Behavior::Reject(message.to_string())),
            requests: Mutex::new(Vec::new()),
            healthy: true,
        })
    }

    /// Engine answering every analysis with an upstream `status`.
    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(Behavior::Fail(status)),
            requests: Mutex::new(Vec::new()),
            healthy: true,
        })
    }

    pub fn unhealthy() -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(Behavior::Reply(json!({"analytics": {}}))),
            requests: Mutex::new(Vec::new()),
            healthy: false,
        })
    }

    pub fn requests(&self) -> Vec<EngineRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The detection map of the only request received.
    pub fn sent_detections(&self) -> Value {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one engine request");
        serde_json::to_value(&requests[0].options.detections).unwrap()
    }
}

#[async_trait]
impl AnalysisEngine for FakeEngine {
    async fn analyze(&self, request: &EngineRequest, ctx: &ShapingContext) -> EngineResult<EngineReply> {
        self.requests.lock().unwrap().push(request.clone());
        match &*self.behavior.lock().unwrap() {
            Behavior::Reply(raw) => Ok(EngineReply {
                result: normalize(raw, ctx)?,
                images: Vec::new(),
            }),
            Behavior::Reject(message) => Err(EngineError::InvalidImages(message.clone())),
            Behavior::Fail(status) => Err(EngineError::Upstream {
                status: *status,
                body: "engine unavailable".to_string(),
            }),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }
}

pub fn view(features: Value) -> ViewConfig {
    serde_json::from_value(json!({
        "id": "view-1",
        "cameraId": "cam-1",
        "site": {"id": "site-1", "timezone": "Europe/Madrid"},
        "company": {"id": "company-1", "integratorId": "integrator-1"},
        "features": features
    }))
    .unwrap()
}

/// In-memory collaborators holding `view-1` with the given features.
pub async fn services(features: Value, capabilities: &[Capability]) -> MemoryServices {
    let memory = MemoryServices::new();
    memory.views.insert(view(features)).await;
    memory.capabilities.grant("integrator-1", capabilities).await;
    memory
}

pub fn pipeline(memory: &MemoryServices, engine: Arc<FakeEngine>) -> AnalysisPipeline {
    AnalysisPipeline::new(memory.services(), engine, TamperingSettings::default()).with_clock(noon)
}

pub fn router(memory: &MemoryServices, engine: Arc<FakeEngine>) -> Router {
    let state = AppState {
        config: ApiConfig::default(),
        pipeline: pipeline(memory, engine.clone()),
        engine,
    };
    create_router(state, None)
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageOutputFormat::Jpeg(80))
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageOutputFormat::Png)
}

fn encode(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}

/// Multipart body with an `options` part and one `images` part per image.
pub fn multipart_body(options: Value, images: &[Vec<u8>]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"options\"\r\n\r\n{options}\r\n"
        )
        .as_bytes(),
    );
    for (i, image) in images.iter().enumerate() {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"frame-{i}.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(image);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(uri: &str, options: Value, images: &[Vec<u8>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .header("x-request-id", "req-test")
        .body(Body::from(multipart_body(options, images)))
        .unwrap()
}

pub fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn send(router: Router, request: Request<Body>) -> Response<Body> {
    router.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
