//! Response normalizer.
//!
//! Turns a raw engine reply into an [`AnalysisResult`]: each known analytics
//! category is shaped by its own function, selected through a fixed
//! category table, and a validity summary is derived from the shaped set.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::attribute::parse_bool;
use crate::category::{Category, CategoryBody, ShapedCategory, Validity, RESERVED_KEYS};
use crate::classification::shape_classification_result;
use crate::error::{ShapeError, ShapeResult};
use crate::face::shape_face_result;
use crate::person::shape_person_result;
use crate::risk::shape_risk_result;
use crate::vehicle::shape_vehicle_result;

/// Request facts that gate optional output fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShapingContext {
    /// Company holds the vehicle embeddings capability.
    pub vehicle_embeddings: bool,
    /// Company holds the person embeddings capability.
    pub person_embeddings: bool,
    /// A face detection was part of the request.
    pub face_configured: bool,
}

/// Shapes every object in a raw array.
///
/// Returns `None` when the key is absent or not an array; non-object
/// entries are skipped.
pub(crate) fn shape_list<T>(
    raw: Option<&Value>,
    shape: impl Fn(&Map<String, Value>) -> T,
) -> Option<Vec<T>> {
    let items = raw?.as_array()?;
    Some(items.iter().filter_map(Value::as_object).map(shape).collect())
}

type Shaper = fn(&Map<String, Value>, &ShapingContext) -> CategoryBody;

fn shaper(category: Category) -> Shaper {
    match category {
        Category::Vehicle => |raw, ctx| CategoryBody::Vehicle(shape_vehicle_result(raw, ctx)),
        Category::Person => |raw, ctx| CategoryBody::Person(shape_person_result(raw, ctx)),
        Category::Face => |raw, _| CategoryBody::Face(shape_face_result(raw)),
        Category::Classification => {
            |raw, _| CategoryBody::Classification(shape_classification_result(raw))
        }
        Category::MultipleRisk => |raw, _| CategoryBody::MultipleRisk(shape_risk_result(raw)),
        Category::Object | Category::Advanced | Category::Gun => |raw, _| passthrough(raw),
    }
}

fn passthrough(raw: &Map<String, Value>) -> CategoryBody {
    let body = raw
        .iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    CategoryBody::Passthrough(body)
}

/// Scene change outcome reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TamperingOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TamperingOutcome {
    fn from_raw(raw: &Map<String, Value>) -> Self {
        let mut extra = raw.clone();
        let detected = extra.remove("detected").as_ref().and_then(parse_bool);
        let score = extra.remove("score").as_ref().and_then(Value::as_f64);
        let error = match extra.remove("error") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };
        Self {
            detected,
            score,
            error,
            extra,
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some() || self.detected.is_none()
    }
}

/// Normalized engine reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// True iff at least one present category is valid.
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tampering: Option<TamperingOutcome>,
    pub analytics: BTreeMap<Category, ShapedCategory>,
}

impl AnalysisResult {
    pub fn result_summary(&self) -> Validity {
        if self.analytics.is_empty() {
            Validity::NotPerformed
        } else if self.valid {
            Validity::Valid
        } else {
            Validity::NotValid
        }
    }

    pub fn result_summaries(&self) -> BTreeMap<Category, Validity> {
        self.analytics
            .iter()
            .map(|(category, shaped)| (*category, shaped.validity))
            .collect()
    }
}

/// Normalizes a raw engine reply.
pub fn normalize(raw: &Value, ctx: &ShapingContext) -> ShapeResult<AnalysisResult> {
    let root = raw.as_object().ok_or(ShapeError::NotAnObject)?;

    let analytics_raw = match root.get("analytics") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => return Err(ShapeError::invalid_field("analytics", "an object")),
    };

    let mut analytics = BTreeMap::new();
    for (key, value) in analytics_raw.into_iter().flatten() {
        let Some(category) = Category::from_upstream_key(key) else {
            debug!(key = %key, "Ignoring unknown analytics category");
            continue;
        };
        let Some(body) = value.as_object() else {
            warn!(key = %key, "Analytics category is not an object, skipping");
            continue;
        };
        let shaped = ShapedCategory::new(body, shaper(category)(body, ctx));
        analytics.insert(category, shaped);
    }

    let tampering = match root.get("tampering") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(TamperingOutcome::from_raw(map)),
        Some(_) => return Err(ShapeError::invalid_field("tampering", "an object")),
    };

    Ok(AnalysisResult {
        valid: analytics.values().any(|shaped| shaped.valid),
        tampering,
        analytics,
    })
}
