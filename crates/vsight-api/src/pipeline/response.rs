//! External response envelope.

use std::collections::BTreeMap;

use serde::Serialize;
use vsight_analytics::{AnalysisResult, Category, ShapedCategory, Validity};
use vsight_models::{NotEligible, SceneChangeStatus, TamperingDecision, WithChecks};

use super::context::TamperingState;

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisEnvelope {
    pub data: AnalysisData,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisData {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: &'static str,
    pub attributes: AnalysisAttributes,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisAttributes {
    pub analytics: AnalyticsBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_change: Option<SceneChange>,
}

/// Validity summary followed by the shaped categories.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsBlock {
    pub result_summary: Validity,
    pub result_summaries: BTreeMap<Category, Validity>,
    #[serde(flatten)]
    pub categories: BTreeMap<Category, ShapedCategory>,
}

/// What happened to scene change detection for this request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneChange {
    pub decision: SceneChangeStatus,
    pub performed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl SceneChange {
    /// `None` when scene change does not apply to the request at all.
    pub fn from_state(state: Option<&TamperingState>, result: &AnalysisResult) -> Option<Self> {
        let state = state?;
        if matches!(
            state.decision,
            TamperingDecision::WithChecks(WithChecks::NotEligible(NotEligible::ViewId(_)))
        ) {
            return None;
        }

        let decision = state.decision.scene_change_status();
        let outcome = result
            .tampering
            .as_ref()
            .filter(|outcome| decision == SceneChangeStatus::Performed && !outcome.failed());

        Some(Self {
            decision,
            performed: outcome.is_some(),
            detected: outcome.and_then(|outcome| outcome.detected),
            score: outcome.and_then(|outcome| outcome.score),
        })
    }
}

impl AnalysisEnvelope {
    pub fn new(
        id: String,
        resource_type: &'static str,
        result: &AnalysisResult,
        scene_change: Option<SceneChange>,
    ) -> Self {
        Self {
            data: AnalysisData {
                id,
                resource_type,
                attributes: AnalysisAttributes {
                    analytics: AnalyticsBlock {
                        result_summary: result.result_summary(),
                        result_summaries: result.result_summaries(),
                        categories: result.analytics.clone(),
                    },
                    scene_change,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vsight_analytics::{normalize, ShapingContext};
    use vsight_models::ReferenceRef;

    fn state(decision: TamperingDecision) -> TamperingState {
        TamperingState {
            sent: decision.clone(),
            decision,
            save_reference: None,
            record_outcome: false,
        }
    }

    #[test]
    fn test_envelope_shape() {
        let result = normalize(
            &json!({
                "analytics": {
                    "person-analysis": {"isValid": "False"},
                    "vehicle-analysis": {"isValid": "True", "vehicles": []}
                }
            }),
            &ShapingContext::default(),
        )
        .unwrap();

        let envelope = AnalysisEnvelope::new("a-1".into(), "alarm-analysis", &result, None);
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["data"]["id"], "a-1");
        assert_eq!(value["data"]["type"], "alarm-analysis");
        let analytics = &value["data"]["attributes"]["analytics"];
        assert_eq!(analytics["resultSummary"], "valid");
        assert_eq!(
            analytics["resultSummaries"],
            json!({"vehicle": "valid", "person": "not_valid"})
        );
        assert_eq!(analytics["person"]["valid"], false);
        assert_eq!(analytics["vehicle"]["valid"], true);
        assert!(value["data"]["attributes"].get("sceneChange").is_none());
    }

    #[test]
    fn test_empty_result_is_not_performed() {
        let envelope =
            AnalysisEnvelope::new("a-2".into(), "chip-analysis", &AnalysisResult::default(), None);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["data"]["attributes"]["analytics"]["resultSummary"], "not_performed");
    }

    #[test]
    fn test_scene_change_performed() {
        let result = normalize(
            &json!({"analytics": {}, "tampering": {"detected": "True", "score": 0.91}}),
            &ShapingContext::default(),
        )
        .unwrap();
        let state = state(TamperingDecision::no_checks(vec![ReferenceRef::id("d1")]));

        let scene_change = SceneChange::from_state(Some(&state), &result).unwrap();
        assert_eq!(
            serde_json::to_value(&scene_change).unwrap(),
            json!({"decision": "performed", "performed": true, "detected": true, "score": 0.91})
        );
    }

    #[test]
    fn test_scene_change_not_performed() {
        let result = AnalysisResult::default();
        let skipped = SceneChange::from_state(Some(&state(TamperingDecision::skip())), &result).unwrap();
        assert_eq!(skipped.decision, SceneChangeStatus::Skipped);
        assert!(!skipped.performed);

        let company = state(TamperingDecision::not_eligible(NotEligible::CompanyId("c1".into())));
        assert_eq!(
            SceneChange::from_state(Some(&company), &result).unwrap().decision,
            SceneChangeStatus::NotEligible
        );

        let view = state(TamperingDecision::not_eligible(NotEligible::ViewId("v1".into())));
        assert!(SceneChange::from_state(Some(&view), &result).is_none());
        assert!(SceneChange::from_state(None, &result).is_none());
    }
}
