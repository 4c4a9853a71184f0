//! Analytics categories and their shaped representation.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::attribute::parse_bool;
use crate::classification::ClassificationResult;
use crate::face::FaceResult;
use crate::person::PersonResult;
use crate::risk::MultipleRiskResult;
use crate::vehicle::VehicleResult;

/// Analytics categories the engine can report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Vehicle,
    Person,
    Face,
    Classification,
    MultipleRisk,
    Object,
    Advanced,
    Gun,
}

impl Category {
    pub const ALL: &'static [Category] = &[
        Category::Vehicle,
        Category::Person,
        Category::Face,
        Category::Classification,
        Category::MultipleRisk,
        Category::Object,
        Category::Advanced,
        Category::Gun,
    ];

    /// Key of this category in the engine reply.
    pub fn upstream_key(&self) -> &'static str {
        match self {
            Category::Vehicle => "vehicle-analysis",
            Category::Person => "person-analysis",
            Category::Face => "face-detection",
            Category::Classification => "scene-classification",
            Category::MultipleRisk => "multiple-risk-analysis",
            Category::Object => "object-detection",
            Category::Advanced => "advanced-rules",
            Category::Gun => "gun-detection",
        }
    }

    /// Key of this category in the shaped response.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Vehicle => "vehicle",
            Category::Person => "person",
            Category::Face => "face",
            Category::Classification => "classification",
            Category::MultipleRisk => "multipleRisk",
            Category::Object => "object",
            Category::Advanced => "advanced",
            Category::Gun => "gun",
        }
    }

    pub fn from_upstream_key(key: &str) -> Option<Category> {
        Category::ALL
            .iter()
            .copied()
            .find(|category| category.upstream_key() == key)
    }
}

/// Per-category outcome used in result summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Validity {
    Valid,
    NotValid,
    NotPerformed,
}

impl Validity {
    /// Classifies a raw category payload.
    ///
    /// An `error` field or a missing/unreadable validity flag means the
    /// category was not performed; an explicit false is `NotValid`.
    pub fn of(raw: &Map<String, Value>) -> Validity {
        if raw.get("error").is_some_and(|e| !e.is_null()) {
            return Validity::NotPerformed;
        }
        let flag = ["isValid", "is_valid", "valid"]
            .iter()
            .find_map(|key| raw.get(*key))
            .and_then(parse_bool);
        match flag {
            Some(true) => Validity::Valid,
            Some(false) => Validity::NotValid,
            None => Validity::NotPerformed,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Validity::Valid => "valid",
            Validity::NotValid => "not_valid",
            Validity::NotPerformed => "not_performed",
        }
    }
}

/// Category-specific shaped content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CategoryBody {
    Vehicle(VehicleResult),
    Person(PersonResult),
    Face(FaceResult),
    Classification(ClassificationResult),
    MultipleRisk(MultipleRiskResult),
    /// Categories forwarded as-is, minus validity bookkeeping.
    Passthrough(Map<String, Value>),
}

/// One shaped analytics category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapedCategory {
    pub valid: bool,
    #[serde(skip)]
    pub validity: Validity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: CategoryBody,
}

impl ShapedCategory {
    pub fn new(raw: &Map<String, Value>, body: CategoryBody) -> Self {
        let validity = Validity::of(raw);
        let error = raw.get("error").and_then(|e| match e {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        });
        Self {
            valid: validity.is_valid(),
            validity,
            error,
            body,
        }
    }
}

/// Raw keys that are bookkeeping rather than content.
pub(crate) const RESERVED_KEYS: &[&str] = &["isValid", "is_valid", "valid", "error"];
