//! Vehicle and licence plate shaping.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::attribute::{parse_index, unpack, unpack_values, Quality};
use crate::normalizer::{shape_list, ShapingContext};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make_model: Option<String>,
    pub color: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Confidence score of the recognized text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<f64>,
    /// Quality bucket of the recognized text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Quality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Value>,
}

/// Vehicles and plates found in one full frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleFrame {
    pub vehicles: Vec<Vehicle>,
    pub plates: Vec<Plate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detections: Option<Vec<VehicleFrame>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicles: Option<Vec<Vehicle>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plates: Option<Vec<Plate>>,
}

pub fn shape_vehicle(raw: &Map<String, Value>, ctx: &ShapingContext) -> Vehicle {
    let make = unpack(raw.get("make")).to_string_value();
    let model = unpack(raw.get("model")).to_string_value();
    let make_model = match (make, model) {
        (Some(make), Some(model)) => Some(format!("{make}, {model}")),
        _ => unpack(raw.get("make_model")).to_string_value(),
    };

    Vehicle {
        vehicle_type: unpack(raw.get("vehicle_type")).to_string_value(),
        make_model,
        color: unpack_values(raw.get("color")),
        embedding: raw
            .get("embedding")
            .filter(|_| ctx.vehicle_embeddings)
            .cloned(),
        bounding_box: raw.get("bbox").cloned(),
    }
}

pub fn shape_plate(raw: &Map<String, Value>) -> Plate {
    let text = unpack(raw.get("text"));
    let vehicle_id = parse_index(raw.get("vehicle_index")).or_else(|| parse_index(raw.get("vehicle_id")));

    Plate {
        quality: unpack(raw.get("quality")).to_string_value(),
        text: text.to_string_value(),
        ranking: text.score,
        rating: text.quality,
        state: unpack(raw.get("state")).to_string_value(),
        vehicle_id,
        bounding_box: raw.get("bbox").cloned(),
    }
}

/// Shapes a vehicle analysis category, full-frame or chip.
pub fn shape_vehicle_result(raw: &Map<String, Value>, ctx: &ShapingContext) -> VehicleResult {
    if let Some(Value::Array(frames)) = raw.get("detections") {
        let detections = frames
            .iter()
            .filter_map(Value::as_object)
            .filter(|frame| frame.contains_key("vehicles") || frame.contains_key("plates"))
            .map(|frame| VehicleFrame {
                vehicles: shape_list(frame.get("vehicles"), |v| shape_vehicle(v, ctx)).unwrap_or_default(),
                plates: shape_list(frame.get("plates"), shape_plate).unwrap_or_default(),
            })
            .collect();
        return VehicleResult {
            detections: Some(detections),
            ..VehicleResult::default()
        };
    }

    VehicleResult {
        detections: None,
        vehicles: shape_list(raw.get("vehicles"), |v| shape_vehicle(v, ctx)),
        plates: shape_list(raw.get("plates"), shape_plate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_make_model_prefers_separate_fields() {
        let ctx = ShapingContext::default();
        let both = shape_vehicle(
            &obj(json!({"make": ["Seat", 0.9], "model": ["Ibiza", 0.8], "make_model": ["Seat Leon", 0.7]})),
            &ctx,
        );
        assert_eq!(both.make_model.as_deref(), Some("Seat, Ibiza"));

        let single = shape_vehicle(&obj(json!({"make": ["Seat"], "make_model": ["Seat Leon"]})), &ctx);
        assert_eq!(single.make_model.as_deref(), Some("Seat Leon"));
    }

    #[test]
    fn test_vehicle_embedding_requires_capability() {
        let raw = obj(json!({"vehicle_type": ["car", 0.99, "high"], "color": [["red", 0.7], ["black", 0.2]], "embedding": [0.1, 0.2]}));

        let without = shape_vehicle(&raw, &ShapingContext::default());
        assert_eq!(without.embedding, None);
        assert_eq!(without.vehicle_type.as_deref(), Some("car"));
        assert_eq!(without.color, vec!["red", "black"]);

        let ctx = ShapingContext {
            vehicle_embeddings: true,
            ..ShapingContext::default()
        };
        assert_eq!(shape_vehicle(&raw, &ctx).embedding, Some(json!([0.1, 0.2])));
    }

    #[test]
    fn test_plate_shaping() {
        let plate = shape_plate(&obj(json!({
            "quality": ["good"],
            "text": ["1234ABC", 0.87, "medium"],
            "state": ["CA", 0.5],
            "vehicle_index": -1,
            "vehicle_id": 3
        })));
        assert_eq!(plate.text.as_deref(), Some("1234ABC"));
        assert_eq!(plate.ranking, Some(0.87));
        assert_eq!(plate.rating, Some(Quality::Medium));
        assert_eq!(plate.state.as_deref(), Some("CA"));
        assert_eq!(plate.quality.as_deref(), Some("good"));
        assert_eq!(plate.vehicle_id, Some(3));

        let orphan = shape_plate(&obj(json!({"text": ["X"], "vehicle_index": -1})));
        assert_eq!(orphan.vehicle_id, None);
        assert!(serde_json::to_value(&orphan).unwrap().get("vehicleId").is_none());
    }

    #[test]
    fn test_full_frame_skips_frames_without_vehicle_keys() {
        let raw = obj(json!({
            "isValid": true,
            "detections": [
                {"vehicles": [{"vehicle_type": ["van"]}]},
                {"persons": []},
                {"plates": [{"text": ["XYZ"]}]}
            ]
        }));
        let result = shape_vehicle_result(&raw, &ShapingContext::default());
        let frames = result.detections.unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].vehicles.len(), 1);
        assert!(frames[0].plates.is_empty());
        assert_eq!(frames[1].plates[0].text.as_deref(), Some("XYZ"));
    }

    #[test]
    fn test_chip_shape_is_flat() {
        let raw = obj(json!({"isValid": "True", "plates": [{"text": ["ABC"]}]}));
        let result = shape_vehicle_result(&raw, &ShapingContext::default());
        assert!(result.detections.is_none());
        assert!(result.vehicles.is_none());
        assert_eq!(result.plates.unwrap().len(), 1);
    }
}
