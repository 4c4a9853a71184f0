//! Face detection shaping.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::attribute::{parse_index, unpack, Quality};
use crate::normalizer::shape_list;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Face {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_index: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceFrame {
    pub faces: Vec<Face>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FaceResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detections: Option<Vec<FaceFrame>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faces: Option<Vec<Face>>,
}

/// Face embeddings are requested explicitly with a model version, so they
/// are always forwarded.
pub fn shape_face(raw: &Map<String, Value>) -> Face {
    // Detectors send either a bare score or a confidence tuple.
    let confidence = unpack(raw.get("confidence").or_else(|| raw.get("score")));
    let score = confidence
        .score
        .or_else(|| confidence.value.as_ref().and_then(Value::as_f64))
        .filter(|score| (0.0..=1.0).contains(score));

    Face {
        bounding_box: raw.get("bbox").cloned(),
        score,
        quality: confidence
            .quality
            .or_else(|| raw.get("quality").and_then(Quality::parse)),
        embedding: raw.get("embedding").filter(|e| !e.is_null()).cloned(),
        person_index: parse_index(raw.get("person_index")),
    }
}

pub fn shape_face_result(raw: &Map<String, Value>) -> FaceResult {
    if let Some(Value::Array(frames)) = raw.get("detections") {
        let detections = frames
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|frame| shape_list(frame.get("faces"), shape_face))
            .map(|faces| FaceFrame { faces })
            .collect();
        return FaceResult {
            detections: Some(detections),
            faces: None,
        };
    }

    FaceResult {
        detections: None,
        faces: shape_list(raw.get("faces"), shape_face),
    }
}
