//! Scene classification shaping.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::attribute::{unpack, Quality};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneClass {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub classes: Vec<SceneClass>,
}

/// Reads `classes` (or `classifications`); entries are confidence tuples
/// or bare labels, and entries without a label are dropped.
pub fn shape_classification_result(raw: &Map<String, Value>) -> ClassificationResult {
    let entries = raw
        .get("classes")
        .or_else(|| raw.get("classifications"))
        .and_then(Value::as_array);

    let classes = entries
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let attr = unpack(Some(entry));
            Some(SceneClass {
                label: attr.to_string_value()?,
                score: attr.score,
                quality: attr.quality,
            })
        })
        .collect();

    ClassificationResult { classes }
}
