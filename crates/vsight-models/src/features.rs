//! Camera view "features": the stored active-detection configuration.
//!
//! Stored configurations are loosely typed (older records use `false` or
//! `null` for a disabled feature), so every feature deserializes through
//! [`falsy_as_none`].

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::detection::ChipTarget;

/// Normalized camera configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    #[serde(default, deserialize_with = "falsy_as_none", skip_serializing_if = "Option::is_none")]
    pub object_detection: Option<ObjectDetection>,
    #[serde(default, deserialize_with = "falsy_as_none", skip_serializing_if = "Option::is_none")]
    pub vehicle_analysis: Option<VehicleAnalysis>,
    #[serde(default, deserialize_with = "falsy_as_none", skip_serializing_if = "Option::is_none")]
    pub person_analysis: Option<PersonAnalysis>,
    #[serde(default, deserialize_with = "falsy_as_none", skip_serializing_if = "Option::is_none")]
    pub scene_classification: Option<SceneClassification>,
    #[serde(default, deserialize_with = "falsy_as_none", skip_serializing_if = "Option::is_none")]
    pub multiple_risk_analysis: Option<MultipleRiskAnalysis>,
    #[serde(default, deserialize_with = "falsy_as_none", skip_serializing_if = "Option::is_none")]
    pub scene_change_detection: Option<SceneChangeDetection>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub advanced_rules: Vec<AdvancedRule>,
}

impl Features {
    /// True when any detection (not counting scene change) is configured.
    pub fn has_active_detection(&self) -> bool {
        self.object_detection.is_some()
            || self.vehicle_analysis.is_some()
            || self.person_analysis.is_some()
            || self.scene_classification.is_some()
            || self.multiple_risk_analysis.is_some()
            || !self.advanced_rules.is_empty()
    }

    /// Active advanced rules.
    pub fn active_rules(&self) -> impl Iterator<Item = &AdvancedRule> {
        self.advanced_rules.iter().filter(|rule| rule.active)
    }
}

/// Legacy object detection configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDetection {
    #[serde(default)]
    pub human_detection: bool,
    #[serde(default)]
    pub vehicle_detection: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleAnalysis {
    /// `"vehicles"` for whole-vehicle chips; anything else means plate chips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chips_type: Option<String>,
}

impl VehicleAnalysis {
    pub fn chip_target(&self) -> ChipTarget {
        chip_target_for(self.chips_type.as_deref())
    }
}

/// Maps a `chipsType` value to the chip detection it selects.
pub fn chip_target_for(chips_type: Option<&str>) -> ChipTarget {
    match chips_type {
        Some("vehicles") => ChipTarget::Vehicle,
        _ => ChipTarget::Lpr,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonAnalysis {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneClassification {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultipleRiskAnalysis {}

/// Scene change configuration; its contents are forwarded to the engine as
/// the tampering configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneChangeDetection {
    #[serde(flatten)]
    pub config: Map<String, Value>,
}

/// Advanced rule detection types, in the order they are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvancedRuleKind {
    Count,
    Loitering,
    Gun,
    Face,
    CrowdForming,
    WatchList,
}

/// One advanced rule. Carries at most one detection sub-object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_detection: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loitering_detection: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gun_detection: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_detection: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crowd_forming_detection: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_list_detection: Option<Value>,
    /// Schedule, zones and other rule attributes passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_active() -> bool {
    true
}

impl Default for AdvancedRule {
    fn default() -> Self {
        Self {
            id: None,
            active: true,
            count_detection: None,
            loitering_detection: None,
            gun_detection: None,
            face_detection: None,
            crowd_forming_detection: None,
            watch_list_detection: None,
            extra: Map::new(),
        }
    }
}

impl AdvancedRule {
    pub fn kind(&self) -> Option<AdvancedRuleKind> {
        let present = |v: &Option<Value>| matches!(v, Some(value) if !value.is_null());
        [
            (&self.count_detection, AdvancedRuleKind::Count),
            (&self.loitering_detection, AdvancedRuleKind::Loitering),
            (&self.gun_detection, AdvancedRuleKind::Gun),
            (&self.face_detection, AdvancedRuleKind::Face),
            (&self.crowd_forming_detection, AdvancedRuleKind::CrowdForming),
            (&self.watch_list_detection, AdvancedRuleKind::WatchList),
        ]
        .into_iter()
        .find(|(value, _)| present(value))
        .map(|(_, kind)| kind)
    }

    pub fn is_face(&self) -> bool {
        self.kind() == Some(AdvancedRuleKind::Face)
    }

    pub fn is_gun(&self) -> bool {
        self.kind() == Some(AdvancedRuleKind::Gun)
    }
}

/// Analytics status of a view, derived from its features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewAnalyticsStatus {
    pub status: AnalyticsActivity,
    pub tampering: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsActivity {
    pub active: bool,
}

pub fn transform_from_features(features: &Features) -> ViewAnalyticsStatus {
    ViewAnalyticsStatus {
        status: AnalyticsActivity {
            active: features.has_active_detection(),
        },
        tampering: features.scene_change_detection.is_some(),
    }
}

/// Treats `null`, `false` and a missing key as "feature disabled"; `true`
/// enables the feature with default settings.
pub fn falsy_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Bool(true)) => Ok(Some(T::default())),
        Some(other) => serde_json::from_value(other).map(Some).map_err(de::Error::custom),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<AdvancedRule>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<AdvancedRule>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transform_from_empty_features() {
        let features: Features = serde_json::from_value(json!({})).unwrap();
        assert_eq!(
            serde_json::to_value(transform_from_features(&features)).unwrap(),
            json!({"status": {"active": false}, "tampering": false})
        );
    }

    #[test]
    fn test_transform_from_configured_features() {
        let features: Features = serde_json::from_value(json!({
            "personAnalysis": {},
            "sceneChangeDetection": {"sensitivity": "high"}
        }))
        .unwrap();
        let status = transform_from_features(&features);
        assert!(status.status.active);
        assert!(status.tampering);
    }

    #[test]
    fn test_falsy_features_are_disabled() {
        let features: Features = serde_json::from_value(json!({
            "objectDetection": false,
            "vehicleAnalysis": null,
            "personAnalysis": true,
            "sceneChangeDetection": false,
            "advancedRules": null
        }))
        .unwrap();
        assert!(features.object_detection.is_none());
        assert!(features.vehicle_analysis.is_none());
        assert_eq!(features.person_analysis, Some(PersonAnalysis {}));
        assert!(features.scene_change_detection.is_none());
        assert!(features.advanced_rules.is_empty());
    }

    #[test]
    fn test_advanced_rule_kind() {
        let rule: AdvancedRule = serde_json::from_value(json!({
            "id": "r1",
            "faceDetection": {"watchListIds": []},
            "schedule": "always"
        }))
        .unwrap();
        assert_eq!(rule.kind(), Some(AdvancedRuleKind::Face));
        assert!(rule.active);
        assert_eq!(rule.extra.get("schedule"), Some(&json!("always")));

        let empty = AdvancedRule::default();
        assert_eq!(empty.kind(), None);
    }

    #[test]
    fn test_chips_type_mapping() {
        let vehicles = VehicleAnalysis {
            chips_type: Some("vehicles".to_string()),
        };
        assert_eq!(vehicles.chip_target(), ChipTarget::Vehicle);
        assert_eq!(VehicleAnalysis::default().chip_target(), ChipTarget::Lpr);
        assert_eq!(chip_target_for(Some("plates")), ChipTarget::Lpr);
    }
}
