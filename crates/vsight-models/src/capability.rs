//! Company capabilities (named entitlements) and the detection → capability table.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::detection::{DetectionConfig, DetectionKind};
use crate::error::ModelError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    PersonAnalytics,
    VehicleAnalytics,
    DetectFace,
    DetectGun,
    SceneClassification,
    MultipleRiskAnalysis,
    SceneChangeDetection,
    VehicleEmbeddings,
    PersonEmbeddings,
}

impl Capability {
    pub const ALL: &'static [Capability] = &[
        Capability::PersonAnalytics,
        Capability::VehicleAnalytics,
        Capability::DetectFace,
        Capability::DetectGun,
        Capability::SceneClassification,
        Capability::MultipleRiskAnalysis,
        Capability::SceneChangeDetection,
        Capability::VehicleEmbeddings,
        Capability::PersonEmbeddings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::PersonAnalytics => "PERSON_ANALYTICS",
            Capability::VehicleAnalytics => "VEHICLE_ANALYTICS",
            Capability::DetectFace => "DETECT_FACE",
            Capability::DetectGun => "DETECT_GUN",
            Capability::SceneClassification => "SCENE_CLASSIFICATION",
            Capability::MultipleRiskAnalysis => "MULTIPLE_RISK_ANALYSIS",
            Capability::SceneChangeDetection => "SCENE_CHANGE_DETECTION",
            Capability::VehicleEmbeddings => "VEHICLE_EMBEDDINGS",
            Capability::PersonEmbeddings => "PERSON_EMBEDDINGS",
        }
    }

    /// Capabilities required to run one detection entry.
    ///
    /// Tampering is gated separately and never appears here.
    pub fn required_for(kind: DetectionKind, config: &DetectionConfig) -> Vec<Capability> {
        match kind {
            DetectionKind::Person => vec![Capability::PersonAnalytics],
            DetectionKind::Vehicle | DetectionKind::Lpr => vec![Capability::VehicleAnalytics],
            DetectionKind::Face => vec![Capability::DetectFace],
            DetectionKind::Gun => vec![Capability::DetectGun],
            DetectionKind::Classification => vec![Capability::SceneClassification],
            DetectionKind::SecurityRisks | DetectionKind::EnvironmentalHazards => {
                vec![Capability::MultipleRiskAnalysis]
            }
            DetectionKind::Advanced => {
                let has_face_rule = config
                    .rules
                    .as_ref()
                    .is_some_and(|rules| rules.iter().any(|rule| rule.is_face()));
                if has_face_rule {
                    vec![Capability::DetectFace]
                } else {
                    Vec::new()
                }
            }
            DetectionKind::Object | DetectionKind::Tampering => Vec::new(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .iter()
            .copied()
            .find(|cap| cap.as_str() == s)
            .ok_or_else(|| ModelError::UnknownCapability(s.to_string()))
    }
}

/// Capability names held by a company, as reported by the platform.
///
/// Unknown names are kept so nothing is lost when the platform adds new ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<String>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(capability.as_str())
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0.insert(capability.as_str().to_string());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<&[Capability]> for CapabilitySet {
    fn from(capabilities: &[Capability]) -> Self {
        capabilities.iter().map(Capability::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::AdvancedRule;
    use serde_json::json;

    #[test]
    fn test_capability_names() {
        assert_eq!(Capability::DetectFace.to_string(), "DETECT_FACE");
        assert_eq!(
            "MULTIPLE_RISK_ANALYSIS".parse::<Capability>().unwrap(),
            Capability::MultipleRiskAnalysis
        );
        assert!("FLY".parse::<Capability>().is_err());
        assert_eq!(
            serde_json::to_value(Capability::VehicleEmbeddings).unwrap(),
            json!("VEHICLE_EMBEDDINGS")
        );
    }

    #[test]
    fn test_required_for_table() {
        let empty = DetectionConfig::empty();
        assert_eq!(
            Capability::required_for(DetectionKind::Lpr, &empty),
            vec![Capability::VehicleAnalytics]
        );
        assert_eq!(
            Capability::required_for(DetectionKind::EnvironmentalHazards, &empty),
            vec![Capability::MultipleRiskAnalysis]
        );
        assert!(Capability::required_for(DetectionKind::Object, &empty).is_empty());
    }

    #[test]
    fn test_advanced_face_rule_requires_face_capability() {
        let face_rule = AdvancedRule {
            face_detection: Some(json!({})),
            ..AdvancedRule::default()
        };
        let count_rule = AdvancedRule {
            count_detection: Some(json!({"threshold": 3})),
            ..AdvancedRule::default()
        };
        let with_face = DetectionConfig::advanced(vec![count_rule.clone(), face_rule]);
        let without_face = DetectionConfig::advanced(vec![count_rule]);

        assert_eq!(
            Capability::required_for(DetectionKind::Advanced, &with_face),
            vec![Capability::DetectFace]
        );
        assert!(Capability::required_for(DetectionKind::Advanced, &without_face).is_empty());
    }

    #[test]
    fn test_capability_set_keeps_unknown_names() {
        let set: CapabilitySet = ["PERSON_ANALYTICS", "SOMETHING_NEW"].into_iter().collect();
        assert!(set.contains(Capability::PersonAnalytics));
        assert!(!set.contains(Capability::DetectFace));
        assert_eq!(set.len(), 2);
    }
}
