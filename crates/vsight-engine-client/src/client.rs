//! Analysis engine HTTP client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use vsight_analytics::{normalize, ShapingContext};

use crate::error::{EngineError, EngineResult};
use crate::metrics;
use crate::types::{
    EngineReply, EngineRequest, HealthResponse, ImagePayload, ReplyImage, UrlRequestBody,
};

/// Header carrying the caller's request id upstream.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Configuration for the engine client.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the analysis engine
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Retries for transport failures
    pub max_retries: u32,
    /// Base delay between retries, doubled per attempt
    pub retry_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 0,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("ENGINE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            timeout: std::env::var("ENGINE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: std::env::var("ENGINE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_delay: std::env::var("ENGINE_RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
        }
    }
}

/// The external analysis engine.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Submit images and return the shaped reply.
    async fn analyze(&self, request: &EngineRequest, ctx: &ShapingContext) -> EngineResult<EngineReply>;

    /// Whether the engine reports itself healthy.
    async fn health_check(&self) -> bool;
}

/// HTTP client for the analysis engine.
pub struct EngineClient {
    http: Client,
    config: EngineConfig,
}

impl EngineClient {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(EngineError::Network)?;

        Ok(Self { http, config })
    }

    pub fn from_env() -> EngineResult<Self> {
        Self::new(EngineConfig::from_env())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Send the request once, as JSON for URLs or multipart for buffers.
    async fn send(&self, url: &str, request: &EngineRequest) -> EngineResult<Response> {
        let builder = self
            .http
            .post(url)
            .header(REQUEST_ID_HEADER, &request.options.request_id);

        let builder = match &request.images {
            ImagePayload::Urls(urls) => builder.json(&UrlRequestBody {
                options: &request.options,
                images: urls,
            }),
            ImagePayload::Buffers(buffers) => {
                let mut form = Form::new().text("options", serde_json::to_string(&request.options)?);
                for image in buffers {
                    let part = Part::bytes(image.data.to_vec())
                        .file_name(image.filename.clone())
                        .mime_str(&image.content_type)?;
                    form = form.part("images", part);
                }
                builder.multipart(form)
            }
        };

        Ok(builder.send().await?)
    }

    async fn call(&self, request: &EngineRequest, ctx: &ShapingContext) -> EngineResult<EngineReply> {
        let url = format!("{}{}", self.config.base_url, request.endpoint.path());
        let endpoint = request.endpoint.as_str();

        debug!(
            url = %url,
            request_id = %request.options.request_id,
            images = request.images.len(),
            "Sending analysis request"
        );

        let started = Instant::now();
        let sent = self.with_retry(|| self.send(&url, request)).await;
        let elapsed = started.elapsed().as_secs_f64();

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                metrics::record_request(endpoint, None, elapsed);
                return Err(e);
            }
        };

        let status = response.status();
        metrics::record_request(endpoint, Some(status.as_u16()), elapsed);

        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::InvalidImages(upstream_message(&body)));
        }
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        read_reply(response, ctx).await
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> EngineResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = EngineResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(self.config.retry_delay, attempt);
                    warn!(
                        "Engine request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl AnalysisEngine for EngineClient {
    async fn analyze(&self, request: &EngineRequest, ctx: &ShapingContext) -> EngineResult<EngineReply> {
        let result = self.call(request, ctx).await;
        if let Err(e) = &result {
            // 422 is a client error.
            if !matches!(e, EngineError::InvalidImages(_)) {
                metrics::record_failure(e.reason());
            }
        }
        result
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.config.base_url);

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<HealthResponse>().await {
                    Ok(health) => health.status == "healthy" || health.status == "ok",
                    Err(e) => {
                        warn!("Engine health response unreadable: {}", e);
                        false
                    }
                }
            }
            Ok(response) => {
                warn!("Engine health check failed: {}", response.status());
                false
            }
            Err(e) => {
                warn!("Engine health check error: {}", e);
                false
            }
        }
    }
}

/// Extract a human readable message from an error body.
/// Exponential backoff, saturating instead of overflowing on large retry counts.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

fn upstream_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "detail", "error"]
                .iter()
                .find_map(|key| value.get(*key)?.as_str().map(str::to_owned))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

async fn read_reply(response: Response, ctx: &ShapingContext) -> EngineResult<EngineReply> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if content_type.starts_with("multipart/") {
        return read_multipart_reply(response, &content_type, ctx).await;
    }

    if content_type.starts_with("application/json") {
        let raw: Value = response.json().await?;
        return Ok(EngineReply {
            result: normalize(&raw, ctx)?,
            images: Vec::new(),
        });
    }

    Err(EngineError::invalid_response(format!(
        "unexpected content type '{}'",
        content_type
    )))
}

/// Parse a multipart reply: one JSON `info` part plus any number of `images`.
async fn read_multipart_reply(
    response: Response,
    content_type: &str,
    ctx: &ShapingContext,
) -> EngineResult<EngineReply> {
    let boundary = multer::parse_boundary(content_type)?;
    let mut multipart = multer::Multipart::new(response.bytes_stream(), boundary);

    let mut info: Option<Value> = None;
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("info") => {
                let data = field.bytes().await?;
                info = Some(serde_json::from_slice(&data)?);
            }
            Some("images") => {
                let filename = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(|m| m.to_string());
                let data = field.bytes().await?;
                images.push(ReplyImage {
                    filename,
                    content_type,
                    data,
                });
            }
            other => debug!(part = ?other, "Ignoring unexpected reply part"),
        }
    }

    let info = info.ok_or_else(|| EngineError::invalid_response("multipart reply has no info part"))?;

    Ok(EngineReply {
        result: normalize(&info, ctx)?,
        images,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CameraRef, CompanyRef, EngineEndpoint, EngineOptions, ImageBuffer, SiteRef};
    use serde_json::json;
    use vsight_analytics::{Category, Validity};
    use vsight_models::{DetectionConfig, DetectionKind, DetectionSet};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_backoff_delay_saturates() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 0), base);
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 40), base.saturating_mul(u32::MAX));
        assert_eq!(backoff_delay(Duration::MAX, 2), Duration::MAX);
    }

    fn client_for(server: &MockServer) -> EngineClient {
        EngineClient::new(EngineConfig {
            base_url: server.uri(),
            ..EngineConfig::default()
        })
        .unwrap()
    }

    fn request(endpoint: EngineEndpoint, images: ImagePayload) -> EngineRequest {
        let mut detections = DetectionSet::new();
        detections.insert(DetectionKind::Person, DetectionConfig::chips(false));
        EngineRequest {
            endpoint,
            options: EngineOptions {
                request_id: "req-1".to_string(),
                site: SiteRef {
                    id: "site-1".to_string(),
                    timezone: "UTC".to_string(),
                },
                company: CompanyRef {
                    id: "company-1".to_string(),
                },
                camera: CameraRef {
                    id: "camera-1".to_string(),
                    view_id: "view-1".to_string(),
                },
                detections,
            },
            images,
        }
    }

    fn url_request() -> EngineRequest {
        request(
            EngineEndpoint::Analysis,
            ImagePayload::Urls(vec!["https://cdn.example.com/a.jpg".to_string()]),
        )
    }

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_upstream_message() {
        assert_eq!(upstream_message(r#"{"message":"image too small"}"#), "image too small");
        assert_eq!(upstream_message(r#"{"detail":"bad jpeg"}"#), "bad jpeg");
        assert_eq!(upstream_message(" plain text "), "plain text");
    }

    #[tokio::test]
    async fn test_json_reply_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analysis"))
            .and(header(REQUEST_ID_HEADER, "req-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "analytics": {
                    "person-analysis": {"isValid": "False"},
                    "vehicle-analysis": {"isValid": "True"}
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .analyze(&url_request(), &ShapingContext::default())
            .await
            .unwrap();

        assert!(reply.result.valid);
        assert_eq!(reply.result.analytics[&Category::Person].validity, Validity::NotValid);
        assert!(reply.images.is_empty());
    }

    #[tokio::test]
    async fn test_multipart_request_and_reply() {
        let server = MockServer::start().await;
        let boundary = "engine-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"info\"\r\nContent-Type: application/json\r\n\r\n\
             {{\"analytics\":{{\"gun-detection\":{{\"isValid\":true,\"guns\":[]}}}}}}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"annotated.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n\
             JPEGDATA\r\n--{b}--\r\n",
            b = boundary
        );
        Mock::given(method("POST"))
            .and(path("/chip"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                body.into_bytes(),
                &format!("multipart/form-data; boundary={}", boundary),
            ))
            .mount(&server)
            .await;

        let chip = request(
            EngineEndpoint::Chip,
            ImagePayload::Buffers(vec![ImageBuffer::jpeg("chip.jpg", vec![0xFF, 0xD8, 0xFF])]),
        );
        let reply = client_for(&server)
            .analyze(&chip, &ShapingContext::default())
            .await
            .unwrap();

        assert!(reply.result.analytics[&Category::Gun].valid);
        assert_eq!(reply.images.len(), 1);
        assert_eq!(reply.images[0].filename.as_deref(), Some("annotated.jpg"));
        assert_eq!(&reply.images[0].data[..], b"JPEGDATA");
    }

    #[tokio::test]
    async fn test_unprocessable_maps_to_invalid_images() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({"message": "No valid images"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .analyze(&url_request(), &ShapingContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidImages(ref msg) if msg == "No valid images"));
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let client = EngineClient::new(EngineConfig {
            base_url: server.uri(),
            max_retries: 3,
            retry_delay: Duration::from_millis(1),
            ..EngineConfig::default()
        })
        .unwrap();

        let err = client
            .analyze(&url_request(), &ShapingContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Upstream { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_unexpected_content_type_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .analyze(&url_request(), &ShapingContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&server)
            .await;

        assert!(client_for(&server).health_check().await);

        let unreachable = EngineClient::new(EngineConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(200),
            ..EngineConfig::default()
        })
        .unwrap();
        assert!(!unreachable.health_check().await);
    }
}
