//! Alarm and chip analysis handlers.
//!
//! Both routes accept either a multipart form (`options` part plus one
//! `images` part per JPEG) or a JSON body carrying image URLs.

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::{Extension, Json};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;
use vsight_engine_client::{ImageBuffer, ImagePayload};
use vsight_models::RawOptions;

use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestId;
use crate::pipeline::{AnalysisEnvelope, AnalysisInput, RequestKind};
use crate::state::AppState;

/// JSON body for URL-based analysis.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlAnalysisRequest {
    #[serde(default)]
    pub options: RawOptions,
    #[serde(default)]
    pub analysis_image_urls: Option<Vec<String>>,
    #[serde(default)]
    pub chip_urls: Option<Vec<String>>,
}

impl UrlAnalysisRequest {
    /// Options and the URL list belonging to `kind`.
    fn into_parts(self, kind: RequestKind) -> (RawOptions, Vec<String>) {
        let urls = match kind {
            RequestKind::Alarm => self.analysis_image_urls,
            RequestKind::Chip => self.chip_urls,
        };
        (self.options, urls.unwrap_or_default())
    }
}

/// Analyze full-frame alarm images.
pub async fn alarm_analysis(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
    request_id: Option<Extension<RequestId>>,
    request: Request,
) -> ApiResult<Json<AnalysisEnvelope>> {
    analyze(state, RequestKind::Alarm, view_id, request_id, request).await
}

/// Analyze cropped chips.
pub async fn chip_analysis(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
    request_id: Option<Extension<RequestId>>,
    request: Request,
) -> ApiResult<Json<AnalysisEnvelope>> {
    analyze(state, RequestKind::Chip, view_id, request_id, request).await
}

async fn analyze(
    state: AppState,
    kind: RequestKind,
    view_id: String,
    request_id: Option<Extension<RequestId>>,
    request: Request,
) -> ApiResult<Json<AnalysisEnvelope>> {
    let request_id = request_id
        .map(|Extension(RequestId(id))| id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let (options, images) = read_body(&state, kind, request).await?;

    let input = AnalysisInput {
        kind,
        view_id,
        request_id,
        options,
        images,
    };

    let envelope = state.pipeline.run(input).await?;
    Ok(Json(envelope))
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

async fn read_body(
    state: &AppState,
    kind: RequestKind,
    request: Request,
) -> ApiResult<(RawOptions, ImagePayload)> {
    if is_multipart(&request) {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        read_multipart(multipart).await
    } else {
        let Json(body) = Json::<UrlAnalysisRequest>::from_request(request, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        let (options, urls) = body.into_parts(kind);
        Ok((options, ImagePayload::Urls(urls)))
    }
}

async fn read_multipart(mut multipart: Multipart) -> ApiResult<(RawOptions, ImagePayload)> {
    let mut options = RawOptions::default();
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "options" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                if !text.trim().is_empty() {
                    options = serde_json::from_str(&text)
                        .map_err(|e| ApiError::bad_request(format!("Invalid options: {}", e)))?;
                }
            }
            "images" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("image-{}.jpg", images.len() + 1));
                let content_type = field.content_type().unwrap_or("image/jpeg").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                images.push(ImageBuffer {
                    filename,
                    content_type,
                    data,
                });
            }
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    Ok((options, ImagePayload::Buffers(images)))
}
