//! In-memory collaborators for tests and local runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use vsight_models::{
    Capability, CapabilitySet, DayPeriod, ReferencePair, StoredReference, TamperingEvent,
    ViewConfig,
};

use super::{
    AnalysisRecord, AnalyticsSink, CapabilityService, ImageStore, ServiceError, ServiceResult,
    Services, TamperingStore, ViewDirectory,
};

#[derive(Default)]
pub struct MemoryViews {
    views: RwLock<HashMap<String, ViewConfig>>,
}

impl MemoryViews {
    pub async fn insert(&self, view: ViewConfig) {
        self.views.write().await.insert(view.id.clone(), view);
    }
}

#[async_trait]
impl ViewDirectory for MemoryViews {
    async fn view(&self, view_id: &str) -> ServiceResult<Option<ViewConfig>> {
        Ok(self.views.read().await.get(view_id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryCapabilities {
    companies: RwLock<HashMap<String, CapabilitySet>>,
}

impl MemoryCapabilities {
    pub async fn grant(&self, company_id: &str, capabilities: &[Capability]) {
        let mut companies = self.companies.write().await;
        let set = companies.entry(company_id.to_string()).or_default();
        for capability in capabilities {
            set.insert(*capability);
        }
    }
}

#[async_trait]
impl CapabilityService for MemoryCapabilities {
    async fn company_capabilities(&self, company_id: &str) -> ServiceResult<CapabilitySet> {
        Ok(self
            .companies
            .read()
            .await
            .get(company_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn missing_capabilities(
        &self,
        company_id: &str,
        required: &[Capability],
    ) -> ServiceResult<Vec<Capability>> {
        let held = self.company_capabilities(company_id).await?;
        Ok(required
            .iter()
            .copied()
            .filter(|capability| !held.contains(*capability))
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryTamperingStore {
    references: RwLock<HashMap<String, ReferencePair>>,
    events: RwLock<Vec<TamperingEvent>>,
}

impl MemoryTamperingStore {
    /// All recorded events, oldest first.
    pub async fn events(&self) -> Vec<TamperingEvent> {
        self.events.read().await.clone()
    }

    pub async fn stored_references(&self, view_id: &str) -> ReferencePair {
        self.references
            .read()
            .await
            .get(view_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl TamperingStore for MemoryTamperingStore {
    async fn references(&self, view_id: &str) -> ServiceResult<ReferencePair> {
        Ok(self.stored_references(view_id).await)
    }

    async fn save_reference(&self, view_id: &str, period: DayPeriod, image_id: &str) -> ServiceResult<()> {
        let mut references = self.references.write().await;
        let pair = references.entry(view_id.to_string()).or_default();
        let stored = Some(StoredReference {
            id: image_id.to_string(),
            created_at: Some(Utc::now()),
        });
        match period {
            DayPeriod::Day => pair.day = stored,
            DayPeriod::Night => pair.night = stored,
        }
        Ok(())
    }

    async fn events_since(&self, view_id: &str, since: DateTime<Utc>) -> ServiceResult<Vec<TamperingEvent>> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .filter(|event| event.view_id == view_id && event.created_at >= since)
            .cloned()
            .collect())
    }

    async fn record_event(&self, event: &TamperingEvent) -> ServiceResult<()> {
        self.events.write().await.push(event.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryImageStore {
    uploads: RwLock<Vec<(String, Bytes)>>,
    remote: RwLock<HashMap<String, Bytes>>,
}

impl MemoryImageStore {
    /// Make `data` fetchable at `url`.
    pub async fn serve(&self, url: &str, data: Bytes) {
        self.remote.write().await.insert(url.to_string(), data);
    }

    /// Uploaded keys in upload order.
    pub async fn uploaded_keys(&self) -> Vec<String> {
        self.uploads
            .read()
            .await
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn upload(&self, key: &str, data: Bytes, _content_type: &str) -> ServiceResult<String> {
        self.uploads.write().await.push((key.to_string(), data));
        Ok(key.to_string())
    }

    async fn fetch(&self, url: &str) -> ServiceResult<Bytes> {
        self.remote
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(url))
    }
}

#[derive(Default)]
pub struct MemoryAnalyticsSink {
    records: RwLock<Vec<AnalysisRecord>>,
}

impl MemoryAnalyticsSink {
    pub async fn records(&self) -> Vec<AnalysisRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl AnalyticsSink for MemoryAnalyticsSink {
    async fn persist(&self, record: &AnalysisRecord) -> ServiceResult<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }
}

/// Typed handles to a full set of in-memory collaborators.
#[derive(Clone, Default)]
pub struct MemoryServices {
    pub views: Arc<MemoryViews>,
    pub capabilities: Arc<MemoryCapabilities>,
    pub tampering: Arc<MemoryTamperingStore>,
    pub images: Arc<MemoryImageStore>,
    pub analytics: Arc<MemoryAnalyticsSink>,
}

impl MemoryServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn services(&self) -> Services {
        Services {
            views: self.views.clone(),
            capabilities: self.capabilities.clone(),
            tampering: self.tampering.clone(),
            images: self.images.clone(),
            analytics: self.analytics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use vsight_models::TamperingEventStatus;

    #[tokio::test]
    async fn test_missing_capabilities() {
        let caps = MemoryCapabilities::default();
        caps.grant("c1", &[Capability::PersonAnalytics]).await;

        let missing = caps
            .missing_capabilities("c1", &[Capability::PersonAnalytics, Capability::DetectFace])
            .await
            .unwrap();
        assert_eq!(missing, vec![Capability::DetectFace]);
    }

    #[tokio::test]
    async fn test_events_since_filters_by_view_and_time() {
        let store = MemoryTamperingStore::default();
        let now = Utc::now();
        store
            .record_event(&TamperingEvent::new("v1", TamperingEventStatus::Detected, now - Duration::hours(3)))
            .await
            .unwrap();
        store
            .record_event(&TamperingEvent::new("v1", TamperingEventStatus::NotDetected, now))
            .await
            .unwrap();
        store
            .record_event(&TamperingEvent::new("v2", TamperingEventStatus::Detected, now))
            .await
            .unwrap();

        let events = store.events_since("v1", now - Duration::hours(1)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, TamperingEventStatus::NotDetected);
    }

    #[tokio::test]
    async fn test_save_reference_fills_period() {
        let store = MemoryTamperingStore::default();
        store.save_reference("v1", DayPeriod::Night, "img-1").await.unwrap();

        let pair = store.references("v1").await.unwrap();
        assert!(pair.day.is_none());
        assert_eq!(pair.night.unwrap().id, "img-1");
    }
}
