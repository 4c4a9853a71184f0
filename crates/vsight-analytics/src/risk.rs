//! Security risk and environmental hazard shaping.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::attribute::{unpack, Quality};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Risk {
    pub risk: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleRiskResult {
    pub security_risks: Vec<Risk>,
    pub environmental_hazards: Vec<Risk>,
}

fn shape_risks(raw: Option<&Value>) -> Vec<Risk> {
    raw.and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let attr = unpack(Some(entry));
            Some(Risk {
                risk: attr.to_string_value()?,
                score: attr.score,
                quality: attr.quality,
            })
        })
        .collect()
}

pub fn shape_risk_result(raw: &Map<String, Value>) -> MultipleRiskResult {
    MultipleRiskResult {
        security_risks: shape_risks(raw.get("security_risks").or_else(|| raw.get("securityRisks"))),
        environmental_hazards: shape_risks(
            raw.get("environmental_hazards")
                .or_else(|| raw.get("environmentalHazards")),
        ),
    }
}
