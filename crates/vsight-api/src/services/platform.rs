//! REST client for the platform service.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vsight_models::{
    Capability, CapabilitySet, DayPeriod, ReferencePair, TamperingEvent, ViewConfig,
};

use super::{
    AnalysisRecord, AnalyticsSink, CapabilityService, ImageStore, ServiceError, ServiceResult,
    TamperingStore, ViewDirectory,
};
use crate::config::PlatformConfig;

#[derive(Deserialize)]
struct CapabilitiesResponse {
    #[serde(default)]
    capabilities: Vec<String>,
}

#[derive(Serialize)]
struct CapabilityCheckRequest<'a> {
    capabilities: Vec<&'a str>,
}

#[derive(Deserialize)]
struct CapabilityCheckResponse {
    #[serde(default)]
    missing: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveReferenceRequest<'a> {
    image_id: &'a str,
}

#[derive(Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<TamperingEvent>,
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

/// Platform REST client implementing every collaborator trait.
#[derive(Clone)]
pub struct PlatformClient {
    http: Client,
    config: PlatformConfig,
}

impl PlatformClient {
    pub fn new(config: PlatformConfig) -> ServiceResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ServiceResult<Self> {
        Self::new(PlatformConfig::from_env())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> ServiceResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(body));
        }
        Err(ServiceError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ServiceResult<T> {
        let response = self.send(self.http.get(self.url(path))).await?;
        Ok(response.json().await?)
    }
}

fn view_path(view_id: &str) -> String {
    format!("/views/{}", urlencoding::encode(view_id))
}

#[async_trait]
impl ViewDirectory for PlatformClient {
    async fn view(&self, view_id: &str) -> ServiceResult<Option<ViewConfig>> {
        match self.get_json(&view_path(view_id)).await {
            Ok(view) => Ok(Some(view)),
            Err(ServiceError::NotFound(_)) => {
                debug!(view_id = %view_id, "View not found on platform");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl CapabilityService for PlatformClient {
    async fn company_capabilities(&self, company_id: &str) -> ServiceResult<CapabilitySet> {
        let path = format!("/companies/{}/capabilities", urlencoding::encode(company_id));
        let response: CapabilitiesResponse = self.get_json(&path).await?;
        Ok(response.capabilities.into_iter().collect())
    }

    async fn missing_capabilities(
        &self,
        company_id: &str,
        required: &[Capability],
    ) -> ServiceResult<Vec<Capability>> {
        let path = format!("/companies/{}/capabilities/check", urlencoding::encode(company_id));
        let body = CapabilityCheckRequest {
            capabilities: required.iter().map(Capability::as_str).collect(),
        };
        let response: CapabilityCheckResponse = self
            .send(self.http.post(self.url(&path)).json(&body))
            .await?
            .json()
            .await?;

        Ok(response
            .missing
            .iter()
            .filter_map(|name| match name.parse() {
                Ok(capability) => Some(capability),
                Err(e) => {
                    warn!(error = %e, "Ignoring unknown capability from platform");
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl TamperingStore for PlatformClient {
    async fn references(&self, view_id: &str) -> ServiceResult<ReferencePair> {
        match self
            .get_json(&format!("{}/tampering/references", view_path(view_id)))
            .await
        {
            Err(ServiceError::NotFound(_)) => Ok(ReferencePair::default()),
            other => other,
        }
    }

    async fn save_reference(&self, view_id: &str, period: DayPeriod, image_id: &str) -> ServiceResult<()> {
        let path = format!("{}/tampering/references/{}", view_path(view_id), period.as_str());
        self.send(
            self.http
                .put(self.url(&path))
                .json(&SaveReferenceRequest { image_id }),
        )
        .await?;
        Ok(())
    }

    async fn events_since(&self, view_id: &str, since: DateTime<Utc>) -> ServiceResult<Vec<TamperingEvent>> {
        let path = format!(
            "{}/tampering/events?since={}",
            view_path(view_id),
            urlencoding::encode(&since.to_rfc3339_opts(SecondsFormat::Secs, true))
        );
        let response: EventsResponse = self.get_json(&path).await?;
        Ok(response.events)
    }

    async fn record_event(&self, event: &TamperingEvent) -> ServiceResult<()> {
        let path = format!("{}/tampering/events", view_path(&event.view_id));
        self.send(self.http.post(self.url(&path)).json(event)).await?;
        Ok(())
    }
}

#[async_trait]
impl ImageStore for PlatformClient {
    async fn upload(&self, key: &str, data: Bytes, content_type: &str) -> ServiceResult<String> {
        let path = format!("/images?key={}", urlencoding::encode(key));
        let response: UploadResponse = self
            .send(
                self.http
                    .post(self.url(&path))
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .body(data),
            )
            .await?
            .json()
            .await?;
        Ok(response.id)
    }

    async fn fetch(&self, url: &str) -> ServiceResult<Bytes> {
        let response = self.send(self.http.get(url)).await?;
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl AnalyticsSink for PlatformClient {
    async fn persist(&self, record: &AnalysisRecord) -> ServiceResult<()> {
        self.send(self.http.post(self.url("/analytics")).json(record))
            .await?;
        Ok(())
    }
}
