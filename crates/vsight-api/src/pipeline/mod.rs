//! Analysis pipeline.
//!
//! One request runs these stages in order, stopping at the first error:
//! view lookup, option parsing, detection selection, capability gate,
//! image validation, tampering decision, engine call, response shaping.
//! Persisting the result and storing images happen in detached tasks.

pub mod background;
pub mod capability;
pub mod context;
pub mod error;
pub mod options;
pub mod response;
pub mod selector;
pub mod tampering;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use vsight_engine_client::{
    AnalysisEngine, CameraRef, CompanyRef, EngineOptions, EngineReply, EngineRequest, SiteRef,
};
use vsight_models::{CapabilitySet, TamperingDecision, WithChecks};

use crate::config::TamperingSettings;
use crate::metrics;
use crate::services::{AnalysisRecord, Services};
use background::{spawn_logged, ImageSource};

pub use context::{AnalysisInput, RequestContext, RequestKind, TamperingState};
pub use error::{PipelineError, PipelineResult};
pub use response::{AnalysisEnvelope, SceneChange};

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Response plus handles to the background work it started.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub response: AnalysisEnvelope,
    pub background: Vec<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct AnalysisPipeline {
    services: Services,
    engine: Arc<dyn AnalysisEngine>,
    settings: TamperingSettings,
    clock: Clock,
}

impl AnalysisPipeline {
    pub fn new(services: Services, engine: Arc<dyn AnalysisEngine>, settings: TamperingSettings) -> Self {
        Self {
            services,
            engine,
            settings,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Run the pipeline and return the response, leaving background work detached.
    pub async fn run(&self, input: AnalysisInput) -> PipelineResult<AnalysisEnvelope> {
        Ok(self.execute(input).await?.response)
    }

    pub async fn execute(&self, input: AnalysisInput) -> PipelineResult<PipelineOutcome> {
        let kind = input.kind;
        let view_id = input.view_id.clone();
        let request_id = input.request_id.clone();

        let result = self.execute_stages(input).await;
        if let Err(e) = &result {
            metrics::record_rejection(e.stage());
            match e {
                PipelineError::Engine(_) | PipelineError::Service(_) => warn!(
                    request_id = %request_id,
                    view_id = %view_id,
                    kind = kind.as_str(),
                    error = %e,
                    "Analysis failed"
                ),
                _ => info!(
                    request_id = %request_id,
                    view_id = %view_id,
                    kind = kind.as_str(),
                    stage = e.stage(),
                    reason = %e,
                    "Analysis rejected"
                ),
            }
        }
        result
    }

    async fn execute_stages(&self, input: AnalysisInput) -> PipelineResult<PipelineOutcome> {
        let view = self
            .services
            .views
            .view(&input.view_id)
            .await?
            .ok_or_else(|| PipelineError::ViewNotFound(input.view_id.clone()))?;

        let options = options::parse_options(&input.options, input.kind)?;

        let (detections, chip_target) = match input.kind {
            RequestKind::Alarm => {
                let detections = selector::select_alarm(&view.features, options.embeddings_version);
                if detections.is_empty() && view.features.scene_change_detection.is_none() {
                    return Err(PipelineError::invalid("No analytics are configured for this view"));
                }
                (detections, None)
            }
            RequestKind::Chip => {
                let (target, detections) = selector::select_chip(
                    &view.features,
                    options.analysis_type,
                    options.embeddings_version,
                )?;
                (detections, Some(target))
            }
        };

        let mut ctx = RequestContext {
            kind: input.kind,
            request_id: input.request_id,
            view,
            options,
            detections,
            chip_target,
            images: input.images,
            capabilities: CapabilitySet::default(),
            gated_tampering: None,
            tampering: None,
            now: (self.clock)(),
        };

        capability::check_capabilities(&mut ctx, self.services.capabilities.as_ref()).await?;
        validation::validate_images(&ctx)?;

        let mut background = Vec::new();
        if ctx.kind == RequestKind::Alarm {
            let state = self.plan_tampering(&ctx).await;
            metrics::record_tampering_decision(state.decision.label());
            ctx.detections.set_tampering(state.sent.clone());
            background.extend(self.spawn_reference_tasks(&ctx, &state));
            ctx.tampering = Some(state);
        }

        info!(
            request_id = %ctx.request_id,
            view_id = %ctx.view_id(),
            kind = ctx.kind.as_str(),
            detections = ?ctx.detection_names(),
            images = ctx.images.len(),
            "Sending analysis request"
        );

        let reply = match self.call_engine(&ctx).await {
            Ok(reply) => reply,
            Err(e) => {
                if ctx.tampering.as_ref().is_some_and(|state| state.record_outcome) {
                    let event = tampering::failed_event(ctx.view_id(), &e.to_string(), (self.clock)());
                    background.push(self.spawn_event(&ctx, event));
                }
                return Err(e);
            }
        };

        if ctx.tampering.as_ref().is_some_and(|state| state.record_outcome) {
            let event = tampering::outcome_event(ctx.view_id(), reply.result.tampering.as_ref(), (self.clock)());
            background.push(self.spawn_event(&ctx, event));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let scene_change = SceneChange::from_state(ctx.tampering.as_ref(), &reply.result);
        let response = AnalysisEnvelope::new(
            id.clone(),
            ctx.kind.resource_type(),
            &reply.result,
            scene_change.clone(),
        );

        metrics::record_analysis(ctx.kind.as_str(), reply.result.result_summary().as_str());
        info!(
            request_id = %ctx.request_id,
            view_id = %ctx.view_id(),
            analysis_id = %id,
            valid = reply.result.valid,
            "Analysis complete"
        );

        background.extend(self.spawn_result_tasks(&ctx, &id, &reply, scene_change));

        Ok(PipelineOutcome { response, background })
    }

    /// Tampering decision, degraded to `skip` if the store is unreachable.
    async fn plan_tampering(&self, ctx: &RequestContext) -> TamperingState {
        match tampering::plan(ctx, self.services.tampering.as_ref(), &self.settings).await {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    request_id = %ctx.request_id,
                    view_id = %ctx.view_id(),
                    error = %e,
                    "Tampering store unavailable, skipping scene change"
                );
                TamperingState {
                    decision: TamperingDecision::skip(),
                    sent: TamperingDecision::skip(),
                    save_reference: None,
                    record_outcome: false,
                }
            }
        }
    }

    async fn call_engine(&self, ctx: &RequestContext) -> PipelineResult<EngineReply> {
        let request = EngineRequest {
            endpoint: ctx.kind.endpoint(),
            options: EngineOptions {
                request_id: ctx.request_id.clone(),
                site: SiteRef {
                    id: ctx.view.site.id.clone(),
                    timezone: ctx.view.site.timezone.clone(),
                },
                company: CompanyRef {
                    id: ctx.view.company.id.clone(),
                },
                camera: CameraRef {
                    id: ctx.view.camera_id.clone(),
                    view_id: ctx.view.id.clone(),
                },
                detections: ctx.detections.clone(),
            },
            images: ctx.images.clone(),
        };
        Ok(self.engine.analyze(&request, &ctx.shaping_context()).await?)
    }

    fn spawn_event(&self, ctx: &RequestContext, event: vsight_models::TamperingEvent) -> JoinHandle<()> {
        spawn_logged(
            "tampering_event",
            ctx.view.id.clone(),
            background::record_event(self.services.tampering.clone(), event),
        )
    }

    /// Reference bookkeeping decided before the engine call.
    fn spawn_reference_tasks(&self, ctx: &RequestContext, state: &TamperingState) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        if let (Some(period), Some(source)) = (state.save_reference, ImageSource::first_of(&ctx.images)) {
            let key = format!("references/{}/{}-{}.jpg", ctx.view.id, period.as_str(), ctx.request_id);
            handles.push(spawn_logged(
                "save_reference",
                ctx.view.id.clone(),
                background::store_reference(
                    self.services.images.clone(),
                    self.services.tampering.clone(),
                    ctx.view.id.clone(),
                    period,
                    key,
                    source,
                ),
            ));
        }

        if matches!(state.decision, TamperingDecision::WithChecks(WithChecks::Unable(_))) {
            let event = tampering::failed_event(ctx.view_id(), tampering::CONSUMED_AS_REFERENCE, ctx.now);
            handles.push(self.spawn_event(ctx, event));
        }

        handles
    }

    /// Result persistence and snapshot upload.
    fn spawn_result_tasks(
        &self,
        ctx: &RequestContext,
        id: &str,
        reply: &EngineReply,
        scene_change: Option<SceneChange>,
    ) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let record = AnalysisRecord {
            id: id.to_string(),
            request_id: ctx.request_id.clone(),
            kind: ctx.kind.as_str(),
            view_id: ctx.view.id.clone(),
            camera_id: ctx.view.camera_id.clone(),
            company_id: ctx.view.company.id.clone(),
            detections: ctx.detection_names(),
            result: reply.result.clone(),
            scene_change,
            created_at: ctx.now,
        };
        handles.push(spawn_logged(
            "persist_result",
            ctx.view.id.clone(),
            background::persist_record(self.services.analytics.clone(), record),
        ));

        if let Some(source) = ImageSource::snapshot(&reply.images, &ctx.images) {
            let key = format!("snapshots/{}/{}.jpg", ctx.view.id, id);
            handles.push(spawn_logged(
                "upload_snapshot",
                ctx.view.id.clone(),
                background::upload_image(self.services.images.clone(), key, source),
            ));
        }

        handles
    }
}
