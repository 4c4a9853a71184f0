//! Fixtures shared by the pipeline unit tests.

use std::io::Cursor;

use chrono::Utc;
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use serde_json::{json, Value};
use vsight_engine_client::{ImageBuffer, ImagePayload};
use vsight_models::{CapabilitySet, DetectionSet, RawOptions, ViewConfig};

use super::context::{RequestContext, RequestKind};
use super::options::parse_options;

pub fn sample_view(features: Value) -> ViewConfig {
    serde_json::from_value(json!({
        "id": "view-1",
        "cameraId": "cam-1",
        "site": {"id": "site-1", "timezone": "Europe/Madrid"},
        "company": {"id": "company-1", "integratorId": "integrator-1"},
        "features": features
    }))
    .unwrap()
}

fn context(kind: RequestKind, options: Value) -> RequestContext {
    let raw: RawOptions = serde_json::from_value(options).unwrap();
    RequestContext {
        kind,
        request_id: "req-1".into(),
        view: sample_view(json!({})),
        options: parse_options(&raw, kind).unwrap(),
        detections: DetectionSet::new(),
        chip_target: None,
        images: ImagePayload::Buffers(vec![jpeg(640, 480)]),
        capabilities: CapabilitySet::default(),
        gated_tampering: None,
        tampering: None,
        now: Utc::now(),
    }
}

pub fn alarm_context(options: Value) -> RequestContext {
    context(RequestKind::Alarm, options)
}

pub fn chip_context(options: Value) -> RequestContext {
    context(RequestKind::Chip, options)
}

pub fn with_features(mut ctx: RequestContext, features: Value) -> RequestContext {
    ctx.view.features = serde_json::from_value(features).unwrap();
    ctx
}

fn encode(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}

pub fn jpeg(width: u32, height: u32) -> ImageBuffer {
    ImageBuffer::jpeg("frame.jpg", encode(width, height, ImageOutputFormat::Jpeg(80)))
}

pub fn png(width: u32, height: u32) -> ImageBuffer {
    ImageBuffer::jpeg("frame.png", encode(width, height, ImageOutputFormat::Png))
}
