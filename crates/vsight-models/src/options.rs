//! Client request options, raw and normalized.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::detection::{ChipTarget, EmbeddingsVersion};
use crate::tampering::ReferenceRef;

/// Options exactly as the client sent them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perform_scene_change_detection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_change_reference_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_chips_embeddings_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_type: Option<Map<String, Value>>,
}

/// Options after validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyzeOptions {
    pub scene_change: SceneChangeOptions,
    pub embeddings_version: EmbeddingsVersion,
    /// Client-selected chip detection (chip requests only).
    pub analysis_type: Option<ChipTarget>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneChangeOptions {
    /// The client explicitly set `performSceneChangeDetection`.
    pub force: bool,
    pub perform: bool,
    /// References to compare against; client URLs when given, otherwise
    /// filled from the stored day/night references.
    pub references: Vec<ReferenceRef>,
}
