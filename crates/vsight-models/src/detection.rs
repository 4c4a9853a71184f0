//! Detection vocabulary sent to the analysis engine.
//!
//! A request carries a map of detection name to a small options object.
//! The names come from a fixed vocabulary ([`DetectionKind`]); the scene
//! change entry is carried separately as a [`TamperingDecision`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ModelError;
use crate::features::{AdvancedRule, ObjectDetection};
use crate::tampering::TamperingDecision;

/// Detection names understood by the analysis engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub enum DetectionKind {
    Object,
    Advanced,
    Vehicle,
    Person,
    Face,
    Classification,
    SecurityRisks,
    EnvironmentalHazards,
    Gun,
    Lpr,
    Tampering,
}

impl DetectionKind {
    pub const ALL: &'static [DetectionKind] = &[
        DetectionKind::Object,
        DetectionKind::Advanced,
        DetectionKind::Vehicle,
        DetectionKind::Person,
        DetectionKind::Face,
        DetectionKind::Classification,
        DetectionKind::SecurityRisks,
        DetectionKind::EnvironmentalHazards,
        DetectionKind::Gun,
        DetectionKind::Lpr,
        DetectionKind::Tampering,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionKind::Object => "object",
            DetectionKind::Advanced => "advanced",
            DetectionKind::Vehicle => "vehicle",
            DetectionKind::Person => "person",
            DetectionKind::Face => "face",
            DetectionKind::Classification => "classification",
            DetectionKind::SecurityRisks => "securityRisks",
            DetectionKind::EnvironmentalHazards => "environmentalHazards",
            DetectionKind::Gun => "gun",
            DetectionKind::Lpr => "lpr",
            DetectionKind::Tampering => "tampering",
        }
    }
}

impl fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DetectionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ModelError::UnknownDetection(s.to_string()))
    }
}

/// Single-focus detections a chip request can carry.
///
/// Variants are declared in priority order: when several are configured for
/// a camera, the first one wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ChipTarget {
    Gun,
    Face,
    Person,
    Lpr,
    Vehicle,
}

impl ChipTarget {
    pub fn detection_kind(&self) -> DetectionKind {
        match self {
            ChipTarget::Gun => DetectionKind::Gun,
            ChipTarget::Face => DetectionKind::Face,
            ChipTarget::Person => DetectionKind::Person,
            ChipTarget::Lpr => DetectionKind::Lpr,
            ChipTarget::Vehicle => DetectionKind::Vehicle,
        }
    }

    /// Whether a camera configured for `self` can serve a client asking for `requested`.
    ///
    /// Vehicle and plate chips come from the same vehicle analysis feature,
    /// so either one satisfies the other.
    pub fn satisfies(&self, requested: ChipTarget) -> bool {
        match (self, requested) {
            (ChipTarget::Vehicle | ChipTarget::Lpr, ChipTarget::Vehicle | ChipTarget::Lpr) => true,
            (own, requested) => *own == requested,
        }
    }

    /// Minimum chip dimensions (width, height) accepted for this target.
    pub fn min_dimensions(&self) -> Option<(u32, u32)> {
        match self {
            ChipTarget::Vehicle | ChipTarget::Lpr => Some((150, 150)),
            ChipTarget::Gun => Some((35, 35)),
            ChipTarget::Person => Some((40, 100)),
            ChipTarget::Face => None,
        }
    }
}

impl fmt::Display for ChipTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.detection_kind().as_str())
    }
}

/// Version of the embeddings vector format requested for face detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum EmbeddingsVersion {
    #[default]
    #[serde(rename = "v5")]
    V5,
    #[serde(rename = "v6")]
    V6,
}

impl EmbeddingsVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingsVersion::V5 => "v5",
            EmbeddingsVersion::V6 => "v6",
        }
    }
}

impl FromStr for EmbeddingsVersion {
    type Err = ModelError;

    /// Parses the client form (`"5"`, `"6"`) as well as the wire form (`"v5"`, `"v6"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('v') {
            "5" => Ok(EmbeddingsVersion::V5),
            "6" => Ok(EmbeddingsVersion::V6),
            _ => Err(ModelError::InvalidEmbeddingsVersion(s.to_string())),
        }
    }
}

/// Options object attached to one detection entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chips: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<EmbeddingsVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_detection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_detection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<AdvancedRule>>,
}

impl DetectionConfig {
    /// An entry with no options (`{}`).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn chips(chips: bool) -> Self {
        Self {
            chips: Some(chips),
            ..Self::default()
        }
    }

    pub fn face(chips: bool, embeddings: EmbeddingsVersion) -> Self {
        Self {
            chips: Some(chips),
            embeddings: Some(embeddings),
            ..Self::default()
        }
    }

    pub fn object(object: &ObjectDetection) -> Self {
        Self {
            human_detection: Some(object.human_detection),
            vehicle_detection: Some(object.vehicle_detection),
            ..Self::default()
        }
    }

    pub fn advanced(rules: Vec<AdvancedRule>) -> Self {
        Self {
            rules: Some(rules),
            ..Self::default()
        }
    }
}

/// The full detection map of one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
    entries: BTreeMap<DetectionKind, DetectionConfig>,
    tampering: Option<TamperingDecision>,
}

impl DetectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: DetectionKind, config: DetectionConfig) {
        self.entries.insert(kind, config);
    }

    pub fn get(&self, kind: DetectionKind) -> Option<&DetectionConfig> {
        self.entries.get(&kind)
    }

    pub fn contains(&self, kind: DetectionKind) -> bool {
        self.entries.contains_key(&kind)
    }

    /// Detection entries, excluding tampering.
    pub fn iter(&self) -> impl Iterator<Item = (DetectionKind, &DetectionConfig)> {
        self.entries.iter().map(|(kind, config)| (*kind, config))
    }

    pub fn kinds(&self) -> impl Iterator<Item = DetectionKind> + '_ {
        self.entries.keys().copied()
    }

    /// Number of entries, excluding tampering.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tampering(&self) -> Option<&TamperingDecision> {
        self.tampering.as_ref()
    }

    pub fn set_tampering(&mut self, decision: TamperingDecision) {
        self.tampering = Some(decision);
    }

    pub fn clear_tampering(&mut self) {
        self.tampering = None;
    }
}

impl Serialize for DetectionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.entries.len() + usize::from(self.tampering.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (kind, config) in &self.entries {
            map.serialize_entry(kind.as_str(), config)?;
        }
        if let Some(decision) = &self.tampering {
            map.serialize_entry(DetectionKind::Tampering.as_str(), decision)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tampering::SkipDetails;
    use serde_json::json;

    #[test]
    fn test_detection_kind_roundtrip_names() {
        for kind in DetectionKind::ALL {
            assert_eq!(kind.as_str().parse::<DetectionKind>().unwrap(), *kind);
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                json!(kind.as_str())
            );
        }
        assert!("objects".parse::<DetectionKind>().is_err());
    }

    #[test]
    fn test_chip_priority_order() {
        let mut targets = vec![
            ChipTarget::Vehicle,
            ChipTarget::Person,
            ChipTarget::Gun,
            ChipTarget::Lpr,
            ChipTarget::Face,
        ];
        targets.sort();
        assert_eq!(
            targets,
            vec![
                ChipTarget::Gun,
                ChipTarget::Face,
                ChipTarget::Person,
                ChipTarget::Lpr,
                ChipTarget::Vehicle
            ]
        );
    }

    #[test]
    fn test_vehicle_and_lpr_satisfy_each_other() {
        assert!(ChipTarget::Lpr.satisfies(ChipTarget::Vehicle));
        assert!(ChipTarget::Vehicle.satisfies(ChipTarget::Lpr));
        assert!(ChipTarget::Gun.satisfies(ChipTarget::Gun));
        assert!(!ChipTarget::Face.satisfies(ChipTarget::Person));
    }

    #[test]
    fn test_embeddings_version_parse() {
        assert_eq!("5".parse::<EmbeddingsVersion>().unwrap(), EmbeddingsVersion::V5);
        assert_eq!("v6".parse::<EmbeddingsVersion>().unwrap(), EmbeddingsVersion::V6);
        assert!("7".parse::<EmbeddingsVersion>().is_err());
    }

    #[test]
    fn test_detection_set_serializes_flat_map() {
        let mut set = DetectionSet::new();
        set.insert(DetectionKind::Face, DetectionConfig::face(true, EmbeddingsVersion::V6));
        set.insert(DetectionKind::Classification, DetectionConfig::empty());
        set.set_tampering(TamperingDecision::Skip(SkipDetails::default()));

        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            json!({
                "face": {"chips": true, "embeddings": "v6"},
                "classification": {},
                "tampering": {"skip": {}}
            })
        );
        assert_eq!(set.len(), 1 + 1);
    }
}
