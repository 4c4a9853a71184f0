//! Fire-and-forget work that follows an analysis.
//!
//! Failures are logged and counted, never surfaced to the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use vsight_engine_client::{ImagePayload, ReplyImage};
use vsight_models::{DayPeriod, TamperingEvent};

use crate::metrics::record_background_failure;
use crate::services::{
    AnalysisRecord, AnalyticsSink, ImageStore, ServiceResult, TamperingStore,
};

/// Upper bound for one background task.
const TASK_TIMEOUT: Duration = Duration::from_secs(30);

/// Spawn `fut` detached, logging its failure.
pub fn spawn_logged<F>(task: &'static str, view_id: String, fut: F) -> JoinHandle<()>
where
    F: Future<Output = ServiceResult<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match tokio::time::timeout(TASK_TIMEOUT, fut).await {
            Ok(Ok(())) => debug!(task, view_id = %view_id, "Background task finished"),
            Ok(Err(e)) => {
                warn!(task, view_id = %view_id, error = %e, "Background task failed");
                record_background_failure(task);
            }
            Err(_) => {
                warn!(task, view_id = %view_id, "Background task timed out");
                record_background_failure(task);
            }
        }
    })
}

/// Where an image to store comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Inline { data: Bytes, content_type: String },
    Remote(String),
}

impl ImageSource {
    /// The first image of the request.
    pub fn first_of(images: &ImagePayload) -> Option<Self> {
        match images {
            ImagePayload::Buffers(buffers) => buffers.first().map(|buffer| ImageSource::Inline {
                data: buffer.data.clone(),
                content_type: buffer.content_type.clone(),
            }),
            ImagePayload::Urls(urls) => urls.first().cloned().map(ImageSource::Remote),
        }
    }

    /// Snapshot to keep: the first image returned by the engine, else the
    /// first uploaded request image.
    pub fn snapshot(reply_images: &[ReplyImage], images: &ImagePayload) -> Option<Self> {
        if let Some(image) = reply_images.first() {
            return Some(ImageSource::Inline {
                data: image.data.clone(),
                content_type: image
                    .content_type
                    .clone()
                    .unwrap_or_else(|| "image/jpeg".to_string()),
            });
        }
        match images {
            ImagePayload::Buffers(_) => Self::first_of(images),
            ImagePayload::Urls(_) => None,
        }
    }

    async fn resolve(self, images: &dyn ImageStore) -> ServiceResult<(Bytes, String)> {
        match self {
            ImageSource::Inline { data, content_type } => Ok((data, content_type)),
            ImageSource::Remote(url) => Ok((images.fetch(&url).await?, "image/jpeg".to_string())),
        }
    }
}

pub async fn persist_record(sink: Arc<dyn AnalyticsSink>, record: AnalysisRecord) -> ServiceResult<()> {
    sink.persist(&record).await
}

pub async fn upload_image(
    images: Arc<dyn ImageStore>,
    key: String,
    source: ImageSource,
) -> ServiceResult<()> {
    let (data, content_type) = source.resolve(images.as_ref()).await?;
    let id = images.upload(&key, data, &content_type).await?;
    debug!(key = %key, image_id = %id, "Stored image");
    Ok(())
}

/// Store `source` and make it the view's reference for `period`.
pub async fn store_reference(
    images: Arc<dyn ImageStore>,
    tampering: Arc<dyn TamperingStore>,
    view_id: String,
    period: DayPeriod,
    key: String,
    source: ImageSource,
) -> ServiceResult<()> {
    let (data, content_type) = source.resolve(images.as_ref()).await?;
    let id = images.upload(&key, data, &content_type).await?;
    tampering.save_reference(&view_id, period, &id).await
}

pub async fn record_event(tampering: Arc<dyn TamperingStore>, event: TamperingEvent) -> ServiceResult<()> {
    tampering.record_event(&event).await
}
