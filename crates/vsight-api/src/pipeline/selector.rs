//! Detection selection.
//!
//! Alarms run every configured detection. Chips run exactly one, picked
//! from the configured candidates by the client's `analysisType` selector
//! and a fixed priority order (gun, face, person, lpr, vehicle).

use tracing::{info, warn};
use vsight_models::{
    AdvancedRule, ChipTarget, DetectionConfig, DetectionKind, DetectionSet, EmbeddingsVersion,
    Features,
};

use super::error::{PipelineError, PipelineResult};

/// Detections for a full-frame alarm.
pub fn select_alarm(features: &Features, version: EmbeddingsVersion) -> DetectionSet {
    let mut detections = DetectionSet::new();

    if !features.advanced_rules.is_empty() {
        if features.object_detection.is_some() {
            warn!("View has both advanced rules and object detection, ignoring object detection");
        }

        let (face_rules, rules): (Vec<&AdvancedRule>, Vec<&AdvancedRule>) =
            features.active_rules().partition(|rule| rule.is_face());

        if !face_rules.is_empty() {
            detections.insert(DetectionKind::Face, DetectionConfig::face(false, version));
        }
        if !rules.is_empty() {
            detections.insert(
                DetectionKind::Advanced,
                DetectionConfig::advanced(rules.into_iter().cloned().collect()),
            );
        }
    } else if let Some(object) = &features.object_detection {
        detections.insert(DetectionKind::Object, DetectionConfig::object(object));
    }

    if features.vehicle_analysis.is_some() {
        detections.insert(DetectionKind::Vehicle, DetectionConfig::chips(false));
    }
    if features.person_analysis.is_some() {
        detections.insert(DetectionKind::Person, DetectionConfig::chips(false));
    }
    if features.scene_classification.is_some() {
        detections.insert(DetectionKind::Classification, DetectionConfig::empty());
    }
    if features.multiple_risk_analysis.is_some() {
        detections.insert(DetectionKind::SecurityRisks, DetectionConfig::empty());
        detections.insert(DetectionKind::EnvironmentalHazards, DetectionConfig::empty());
    }

    detections
}

/// Chip detections the view is configured for, unordered.
fn chip_candidates(features: &Features) -> Vec<ChipTarget> {
    let mut candidates: Vec<ChipTarget> = features
        .active_rules()
        .filter_map(|rule| {
            if rule.is_gun() {
                Some(ChipTarget::Gun)
            } else if rule.is_face() {
                Some(ChipTarget::Face)
            } else {
                None
            }
        })
        .collect();

    if let Some(vehicle) = &features.vehicle_analysis {
        candidates.push(vehicle.chip_target());
    }
    if features.person_analysis.is_some() {
        candidates.push(ChipTarget::Person);
    }
    candidates
}

/// The single detection for a chip request.
pub fn select_chip(
    features: &Features,
    selector: Option<ChipTarget>,
    version: EmbeddingsVersion,
) -> PipelineResult<(ChipTarget, DetectionSet)> {
    if features.advanced_rules.is_empty()
        && features.vehicle_analysis.is_none()
        && features.person_analysis.is_none()
    {
        return Err(PipelineError::invalid(
            "Chip analysis requires advanced rules, vehicle analysis or person analysis on the view",
        ));
    }

    let mut candidates = chip_candidates(features);

    if let Some(requested) = selector {
        candidates = candidates
            .into_iter()
            .filter(|candidate| candidate.satisfies(requested))
            .collect();
        if candidates.is_empty() {
            info!(requested = %requested, "Requested chip analysis is not configured");
            return Err(PipelineError::invalid(format!(
                "Analysis type '{}' is not configured for this view",
                requested
            )));
        }
    }

    // ChipTarget is declared in priority order.
    let target = candidates
        .into_iter()
        .min()
        .ok_or_else(|| PipelineError::invalid("No chip analysis is configured for this view"))?;

    let config = match target {
        ChipTarget::Face => DetectionConfig::face(true, version),
        _ => DetectionConfig::chips(true),
    };

    let mut detections = DetectionSet::new();
    detections.insert(target.detection_kind(), config);
    Ok((target, detections))
}
