//! Person attribute shaping.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::attribute::{parse_index, unpack, unpack_values};
use crate::normalizer::{shape_list, ShapingContext};

const NOT_CHILD: &str = "not-child";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// `None` (serialized as null) when the engine did not classify age.
    pub child: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wearing_hard_hat: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highly_visible: Option<bool>,
    pub hair_color: Vec<String>,
    pub clothes_upper_body_color: Vec<String>,
    pub clothes_lower_body_color: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_index: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonFrame {
    pub persons: Vec<Person>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersonResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detections: Option<Vec<PersonFrame>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persons: Option<Vec<Person>>,
}

pub fn shape_person(raw: &Map<String, Value>, ctx: &ShapingContext) -> Person {
    let child = unpack(raw.get("age_type"))
        .value
        .map(|age| age.as_str() != Some(NOT_CHILD));

    Person {
        child,
        gender: unpack(raw.get("gender")).to_string_value(),
        wearing_hard_hat: unpack(raw.get("hard_hat")).as_bool(),
        highly_visible: unpack(raw.get("high_visibility")).as_bool(),
        hair_color: unpack_values(raw.get("hair_color")),
        clothes_upper_body_color: unpack_values(raw.get("upper_clothes_color")),
        clothes_lower_body_color: unpack_values(raw.get("lower_clothes_color")),
        embedding: raw
            .get("embedding")
            .filter(|_| ctx.person_embeddings)
            .cloned(),
        face_index: if ctx.face_configured {
            parse_index(raw.get("face_index"))
        } else {
            None
        },
        bounding_box: raw.get("bbox").cloned(),
    }
}

/// Shapes a person analysis category, full-frame or chip.
pub fn shape_person_result(raw: &Map<String, Value>, ctx: &ShapingContext) -> PersonResult {
    if let Some(Value::Array(frames)) = raw.get("detections") {
        let detections = frames
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|frame| shape_list(frame.get("persons"), |p| shape_person(p, ctx)))
            .map(|persons| PersonFrame { persons })
            .collect();
        return PersonResult {
            detections: Some(detections),
            persons: None,
        };
    }

    PersonResult {
        detections: None,
        persons: shape_list(raw.get("persons"), |p| shape_person(p, ctx)),
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
    fn test_plain_person_payload() {
        let raw = obj(json!({"persons": [{"age_type": "not-child", "gender": "male", "hard_hat": false}]}));
        let result = shape_person_result(&raw, &ShapingContext::default());
        let person = &result.persons.unwrap()[0];

        assert_eq!(
            serde_json::to_value(person).unwrap(),
            json!({
                "child": false,
                "gender": "male",
                "wearingHardHat": false,
                "hairColor": [],
                "clothesUpperBodyColor": [],
                "clothesLowerBodyColor": []
            })
        );
        assert_eq!(person.highly_visible, None);
    }

    #[test]
    fn test_child_derivation() {
        let ctx = ShapingContext::default();
        let child = shape_person(&obj(json!({"age_type": ["child", 0.7, "medium"]})), &ctx);
        assert_eq!(child.child, Some(true));

        let teen = shape_person(&obj(json!({"age_type": ["teenager"]})), &ctx);
        assert_eq!(teen.child, Some(true));

        let unknown = shape_person(&obj(json!({})), &ctx);
        assert_eq!(unknown.child, None);
        assert_eq!(serde_json::to_value(&unknown).unwrap()["child"], Value::Null);
    }

    #[test]
    fn test_tuple_attributes_and_colors() {
        let person = shape_person(
            &obj(json!({
                "gender": ["female", 0.88, "high"],
                "high_visibility": [true, 0.6],
                "hair_color": [["brown", 0.7], ["black", 0.2]],
                "upper_clothes_color": ["red", 0.9],
                "lower_clothes_color": "blue"
            })),
            &ShapingContext::default(),
        );
        assert_eq!(person.gender.as_deref(), Some("female"));
        assert_eq!(person.highly_visible, Some(true));
        assert_eq!(person.hair_color, vec!["brown", "black"]);
        assert_eq!(person.clothes_upper_body_color, vec!["red"]);
        assert_eq!(person.clothes_lower_body_color, vec!["blue"]);
    }

    #[test]
    fn test_gated_fields() {
        let raw = obj(json!({"embedding": [0.5], "face_index": 0}));

        let plain = shape_person(&raw, &ShapingContext::default());
        assert_eq!(plain.embedding, None);
        assert_eq!(plain.face_index, None);

        let ctx = ShapingContext {
            person_embeddings: true,
            face_configured: true,
            ..ShapingContext::default()
        };
        let full = shape_person(&raw, &ctx);
        assert_eq!(full.embedding, Some(json!([0.5])));
        assert_eq!(full.face_index, Some(0));
    }

    #[test]
    fn test_full_frame_skips_frames_without_persons() {
        let raw = obj(json!({
            "detections": [{"persons": [{"gender": "male"}]}, {"vehicles": []}]
        }));
        let result = shape_person_result(&raw, &ShapingContext::default());
        assert_eq!(result.detections.unwrap().len(), 1);
    }

    #[test]
    fn test_shaping_is_repeatable() {
        let raw = obj(json!({"persons": [{"age_type": ["adult"], "hair_color": [["grey", 0.4]]}]}));
        let ctx = ShapingContext::default();
        assert_eq!(shape_person_result(&raw, &ctx), shape_person_result(&raw, &ctx));
    }
}
