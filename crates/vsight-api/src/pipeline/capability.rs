//! Capability gate.

use std::collections::BTreeSet;

use tracing::{debug, info};
use vsight_models::{Capability, DetectionKind, NotEligible, TamperingDecision};

use super::context::{RequestContext, RequestKind};
use super::error::{PipelineError, PipelineResult};
use crate::services::CapabilityService;

/// Capabilities implied by the selected detections, deduplicated.
pub fn required_capabilities(ctx: &RequestContext) -> BTreeSet<Capability> {
    ctx.detections
        .iter()
        .flat_map(|(kind, config)| Capability::required_for(kind, config))
        .collect()
}

/// Whether the request explicitly asked for on-demand scene change detection.
fn wants_on_demand_tampering(ctx: &RequestContext) -> bool {
    ctx.kind == RequestKind::Alarm && ctx.options.scene_change.force && ctx.options.scene_change.perform
}

/// Reject the request when the company lacks a detection capability.
///
/// A missing scene change capability does not fail the request; it marks
/// tampering as not eligible for the company instead.
pub async fn check_capabilities(
    ctx: &mut RequestContext,
    capabilities: &dyn CapabilityService,
) -> PipelineResult<()> {
    let company_id = ctx.view.capability_company_id().to_string();
    let mut required = required_capabilities(ctx);
    let on_demand = wants_on_demand_tampering(ctx);
    if on_demand {
        required.insert(Capability::SceneChangeDetection);
    }

    if !required.is_empty() {
        let required: Vec<Capability> = required.into_iter().collect();
        let missing = capabilities
            .missing_capabilities(&company_id, &required)
            .await?;

        let (tampering, missing): (Vec<Capability>, Vec<Capability>) = missing
            .into_iter()
            .partition(|capability| *capability == Capability::SceneChangeDetection);

        if !missing.is_empty() {
            info!(
                company_id = %company_id,
                missing = ?missing,
                "Rejecting request, company lacks capabilities"
            );
            return Err(PipelineError::MissingCapabilities(missing));
        }

        if on_demand && !tampering.is_empty() {
            debug!(company_id = %company_id, "Scene change capability missing, tampering not eligible");
            ctx.gated_tampering = Some(TamperingDecision::not_eligible(NotEligible::CompanyId(
                company_id.clone(),
            )));
        }
    }

    // Embedding capabilities only change how vehicle and person results are shaped.
    if ctx.detections.contains(DetectionKind::Vehicle) || ctx.detections.contains(DetectionKind::Person) {
        ctx.capabilities = capabilities.company_capabilities(&company_id).await?;
    }

    Ok(())
}
