//! Unpacking of engine attribute encodings.
//!
//! The engine encodes most attributes as a confidence tuple
//! `[value, score?, quality?]`; some older models send the bare value.
//! Both forms unpack to an [`Attribute`]. A missing attribute is not an
//! error: its value is simply `None`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Confidence quality bucket reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    Medium,
    High,
}

impl Quality {
    pub fn parse(value: &Value) -> Option<Quality> {
        match value.as_str()? {
            "low" => Some(Quality::Low),
            "medium" => Some(Quality::Medium),
            "high" => Some(Quality::High),
            _ => None,
        }
    }
}

/// One unpacked attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attribute {
    pub value: Option<Value>,
    pub score: Option<f64>,
    pub quality: Option<Quality>,
}

impl Attribute {
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref()?.as_str()
    }

    pub fn to_string_value(&self) -> Option<String> {
        match self.value.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_ref().and_then(parse_bool)
    }
}

/// Unpacks a confidence tuple or bare value.
///
/// `score` is kept only when it lies in `[0, 1]`, `quality` only when it is
/// one of `low`, `medium`, `high`.
pub fn unpack(raw: Option<&Value>) -> Attribute {
    match raw {
        None | Some(Value::Null) => Attribute::default(),
        Some(Value::Array(items)) => Attribute {
            value: items.first().filter(|v| !v.is_null()).cloned(),
            score: items
                .get(1)
                .and_then(Value::as_f64)
                .filter(|score| (0.0..=1.0).contains(score)),
            quality: items.get(2).and_then(Quality::parse),
        },
        Some(value) => Attribute {
            value: Some(value.clone()),
            score: None,
            quality: None,
        },
    }
}

/// Unpacks a possibly multi-valued attribute into its list of values.
///
/// Accepts a list of tuples (`[["red", 0.8], ["blue", 0.3]]`), a single
/// tuple whose value is a string or a list of strings, or a bare string.
pub fn unpack_values(raw: Option<&Value>) -> Vec<String> {
    match raw {
        Some(Value::Array(items)) if !items.is_empty() && items.iter().all(Value::is_array) => items
            .iter()
            .filter_map(|item| unpack(Some(item)).to_string_value())
            .collect(),
        other => match unpack(other).value {
            Some(Value::String(s)) => vec![s],
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
            _ => Vec::new(),
        },
    }
}

/// Normalizes `true`/`false`, `"True"`/`"False"` and their lowercase forms.
pub fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Reads a non-negative index, accepting integer or integral float encodings.
pub fn parse_index(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    if let Some(index) = value.as_u64() {
        return Some(index);
    }
    value
        .as_f64()
        .filter(|f| *f >= 0.0 && f.fract() == 0.0)
        .map(|f| f as u64)
}
