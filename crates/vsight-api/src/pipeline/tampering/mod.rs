//! Scene change ("tampering") decision engine.
//!
//! Two protocols exist. On-demand requests (the client set
//! `performSceneChangeDetection`) resolve references here and send
//! `noChecks`. Legacy requests run the periodic check: feature, stored
//! references, then whether the current period was already checked.
//!
//! The decision reached is not always what the engine receives: `unable`
//! consumes the image as a new reference and sends `skip`, and `proceed`
//! is sent as `noChecks` with the stored references.

pub mod window;

use chrono::{DateTime, Utc};
use tracing::debug;
use vsight_analytics::TamperingOutcome;
use vsight_models::{
    NotEligible, ReferencePair, TamperingDecision, TamperingEvent, TamperingEventStatus,
    WithChecks,
};

use super::context::{RequestContext, TamperingState};
use super::error::PipelineResult;
use crate::config::TamperingSettings;
use crate::services::TamperingStore;

pub const CONSUMED_AS_REFERENCE: &str =
    "No reference image stored, the alarm image was saved as the reference";

/// Decide and plan scene change handling for an alarm.
pub async fn plan(
    ctx: &RequestContext,
    store: &dyn TamperingStore,
    settings: &TamperingSettings,
) -> PipelineResult<TamperingState> {
    let (decision, references) = decide(ctx, store).await?;

    let tz = window::parse_timezone(&ctx.view.site.timezone);
    let period = window::day_period(ctx.now, tz, settings);

    let (sent, save_reference, record_outcome) = match &decision {
        TamperingDecision::WithChecks(WithChecks::Unable(_)) => {
            (TamperingDecision::skip_no_reference(), Some(period), false)
        }
        TamperingDecision::WithChecks(WithChecks::Proceed(_)) => (
            TamperingDecision::no_checks(references.to_refs()),
            references.missing().filter(|missing| *missing == period.opposite()),
            true,
        ),
        other => (other.clone(), None, false),
    };
    let state = TamperingState {
        decision,
        sent,
        save_reference,
        record_outcome,
    };

    debug!(
        view_id = %ctx.view_id(),
        decision = state.decision.label(),
        sent = state.sent.label(),
        "Tampering decision"
    );
    Ok(state)
}

/// The decision, plus the stored references when they were loaded.
pub async fn decide(
    ctx: &RequestContext,
    store: &dyn TamperingStore,
) -> PipelineResult<(TamperingDecision, ReferencePair)> {
    let scene_change = &ctx.options.scene_change;
    let feature = ctx.view.features.scene_change_detection.as_ref();
    let view_not_eligible = || TamperingDecision::not_eligible(NotEligible::ViewId(ctx.view.id.clone()));

    if scene_change.force {
        if let Some(gated) = &ctx.gated_tampering {
            return Ok((gated.clone(), ReferencePair::default()));
        }
        if feature.is_none() {
            return Ok((view_not_eligible(), ReferencePair::default()));
        }
        if !scene_change.perform {
            return Ok((TamperingDecision::skip(), ReferencePair::default()));
        }
        if !scene_change.references.is_empty() {
            return Ok((
                TamperingDecision::no_checks(scene_change.references.clone()),
                ReferencePair::default(),
            ));
        }

        let stored = store.references(ctx.view_id()).await?;
        let decision = if stored.is_empty() {
            TamperingDecision::skip_no_reference()
        } else {
            TamperingDecision::no_checks(stored.to_refs())
        };
        return Ok((decision, stored));
    }

    let Some(feature) = feature else {
        return Ok((view_not_eligible(), ReferencePair::default()));
    };

    let stored = store.references(ctx.view_id()).await?;
    if stored.is_empty() {
        return Ok((TamperingDecision::unable_no_reference(), stored));
    }

    let tz = window::parse_timezone(&ctx.view.site.timezone);
    let boundary = window::window_boundary(ctx.now, tz, &ctx.view.company.tampering_schedule);
    let already_checked = store
        .events_since(ctx.view_id(), boundary)
        .await?
        .iter()
        .any(|event| event.status != TamperingEventStatus::Failed && event.created_at >= boundary);
    if already_checked {
        return Ok((TamperingDecision::period_already_checked(), stored));
    }

    Ok((
        TamperingDecision::proceed(feature.config.clone(), ctx.view.site.timezone.clone()),
        stored,
    ))
}

/// Event recording the engine's verdict for a periodic check.
pub fn outcome_event(
    view_id: &str,
    outcome: Option<&TamperingOutcome>,
    at: DateTime<Utc>,
) -> TamperingEvent {
    match outcome {
        Some(outcome) if !outcome.failed() => {
            let status = if outcome.detected == Some(true) {
                TamperingEventStatus::Detected
            } else {
                TamperingEventStatus::NotDetected
            };
            TamperingEvent::new(view_id, status, at).with_score(outcome.score)
        }
        Some(outcome) => failed_event(
            view_id,
            outcome
                .error
                .as_deref()
                .unwrap_or("Engine returned no tampering verdict"),
            at,
        ),
        None => failed_event(view_id, "Engine returned no tampering result", at),
    }
}

pub fn failed_event(view_id: &str, message: &str, at: DateTime<Utc>) -> TamperingEvent {
    TamperingEvent::new(view_id, TamperingEventStatus::Failed, at).with_message(message)
}
