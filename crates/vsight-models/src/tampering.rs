//! Scene change ("tampering") decision and event types.
//!
//! [`TamperingDecision`] serializes to the externally tagged shape the
//! analysis engine expects under `detections.tampering`, e.g.
//! `{"withChecks": {"notEligible": {"companyId": "c1"}}}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What to do about scene change detection for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TamperingDecision {
    /// Do not attempt scene change detection.
    Skip(SkipDetails),
    /// References are already resolved; the engine must not re-derive eligibility.
    NoChecks(NoChecks),
    /// Legacy protocol where eligibility and references are checked.
    WithChecks(WithChecks),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipDetails {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_reference_image: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoChecks {
    pub references: Vec<ReferenceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WithChecks {
    NotEligible(NotEligible),
    Unable(UnableDetails),
    Skip(CheckSkip),
    Proceed(ProceedDetails),
}

/// Which gate made the request ineligible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotEligible {
    /// The company lacks the scene change capability.
    CompanyId(String),
    /// The view has no scene change configuration.
    ViewId(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnableDetails {
    pub no_reference_image: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckSkip {
    PeriodDetection(bool),
    NoReferenceImage(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProceedDetails {
    pub tampering_config: Map<String, Value>,
    pub timezone: String,
}

impl TamperingDecision {
    pub fn skip() -> Self {
        TamperingDecision::Skip(SkipDetails::default())
    }

    pub fn skip_no_reference() -> Self {
        TamperingDecision::Skip(SkipDetails {
            no_reference_image: true,
        })
    }

    pub fn no_checks(references: Vec<ReferenceRef>) -> Self {
        TamperingDecision::NoChecks(NoChecks { references })
    }

    pub fn not_eligible(reason: NotEligible) -> Self {
        TamperingDecision::WithChecks(WithChecks::NotEligible(reason))
    }

    pub fn unable_no_reference() -> Self {
        TamperingDecision::WithChecks(WithChecks::Unable(UnableDetails {
            no_reference_image: true,
        }))
    }

    pub fn period_already_checked() -> Self {
        TamperingDecision::WithChecks(WithChecks::Skip(CheckSkip::PeriodDetection(true)))
    }

    pub fn proceed(tampering_config: Map<String, Value>, timezone: impl Into<String>) -> Self {
        TamperingDecision::WithChecks(WithChecks::Proceed(ProceedDetails {
            tampering_config,
            timezone: timezone.into(),
        }))
    }

    pub fn is_not_eligible(&self) -> bool {
        matches!(self, TamperingDecision::WithChecks(WithChecks::NotEligible(_)))
    }

    /// Short name used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            TamperingDecision::Skip(_) => "skip",
            TamperingDecision::NoChecks(_) => "no_checks",
            TamperingDecision::WithChecks(WithChecks::NotEligible(_)) => "not_eligible",
            TamperingDecision::WithChecks(WithChecks::Unable(_)) => "unable",
            TamperingDecision::WithChecks(WithChecks::Skip(_)) => "period_skip",
            TamperingDecision::WithChecks(WithChecks::Proceed(_)) => "proceed",
        }
    }

    /// Outcome reported back to the caller for this decision.
    pub fn scene_change_status(&self) -> SceneChangeStatus {
        match self {
            TamperingDecision::Skip(details) if details.no_reference_image => {
                SceneChangeStatus::NoReferenceImage
            }
            TamperingDecision::Skip(_) => SceneChangeStatus::Skipped,
            TamperingDecision::NoChecks(_) => SceneChangeStatus::Performed,
            TamperingDecision::WithChecks(WithChecks::NotEligible(_)) => {
                SceneChangeStatus::NotEligible
            }
            TamperingDecision::WithChecks(WithChecks::Unable(_))
            | TamperingDecision::WithChecks(WithChecks::Skip(CheckSkip::NoReferenceImage(_))) => {
                SceneChangeStatus::NoReferenceImage
            }
            TamperingDecision::WithChecks(WithChecks::Skip(CheckSkip::PeriodDetection(_))) => {
                SceneChangeStatus::PeriodAlreadyChecked
            }
            TamperingDecision::WithChecks(WithChecks::Proceed(_)) => SceneChangeStatus::Performed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneChangeStatus {
    Skipped,
    NotEligible,
    NoReferenceImage,
    PeriodAlreadyChecked,
    Performed,
}

/// A reference image handed to the engine: a stored image id or a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceRef {
    Id { id: String },
    Url { url: String },
}

impl ReferenceRef {
    pub fn id(id: impl Into<String>) -> Self {
        ReferenceRef::Id { id: id.into() }
    }

    pub fn url(url: impl Into<String>) -> Self {
        ReferenceRef::Url { url: url.into() }
    }
}

/// Time-of-day period a reference image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPeriod {
    Day,
    Night,
}

impl DayPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayPeriod::Day => "day",
            DayPeriod::Night => "night",
        }
    }

    pub fn opposite(&self) -> DayPeriod {
        match self {
            DayPeriod::Day => DayPeriod::Night,
            DayPeriod::Night => DayPeriod::Day,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReference {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Stored day/night reference images of a view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePair {
    #[serde(default)]
    pub day: Option<StoredReference>,
    #[serde(default)]
    pub night: Option<StoredReference>,
}

impl ReferencePair {
    pub fn is_empty(&self) -> bool {
        self.day.is_none() && self.night.is_none()
    }

    pub fn get(&self, period: DayPeriod) -> Option<&StoredReference> {
        match period {
            DayPeriod::Day => self.day.as_ref(),
            DayPeriod::Night => self.night.as_ref(),
        }
    }

    /// The single missing period, when exactly one reference is stored.
    pub fn missing(&self) -> Option<DayPeriod> {
        match (&self.day, &self.night) {
            (Some(_), None) => Some(DayPeriod::Night),
            (None, Some(_)) => Some(DayPeriod::Day),
            _ => None,
        }
    }

    /// Stored references in day, night order.
    pub fn to_refs(&self) -> Vec<ReferenceRef> {
        [&self.day, &self.night]
            .into_iter()
            .flatten()
            .map(|stored| ReferenceRef::id(stored.id.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TamperingEventStatus {
    Detected,
    NotDetected,
    Failed,
}

/// One row of the tampering event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TamperingEvent {
    pub view_id: String,
    pub status: TamperingEventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl TamperingEvent {
    pub fn new(view_id: impl Into<String>, status: TamperingEventStatus, created_at: DateTime<Utc>) -> Self {
        Self {
            view_id: view_id.into(),
            status,
            message: None,
            score: None,
            created_at,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_score(mut self, score: Option<f64>) -> Self {
        self.score = score;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decision_wire_shapes() {
        let cases = vec![
            (TamperingDecision::skip(), json!({"skip": {}})),
            (
                TamperingDecision::skip_no_reference(),
                json!({"skip": {"noReferenceImage": true}}),
            ),
            (
                TamperingDecision::no_checks(vec![ReferenceRef::id("d1"), ReferenceRef::url("https://x/n.jpg")]),
                json!({"noChecks": {"references": [{"id": "d1"}, {"url": "https://x/n.jpg"}]}}),
            ),
            (
                TamperingDecision::not_eligible(NotEligible::CompanyId("c1".into())),
                json!({"withChecks": {"notEligible": {"companyId": "c1"}}}),
            ),
            (
                TamperingDecision::unable_no_reference(),
                json!({"withChecks": {"unable": {"noReferenceImage": true}}}),
            ),
            (
                TamperingDecision::period_already_checked(),
                json!({"withChecks": {"skip": {"periodDetection": true}}}),
            ),
            (
                TamperingDecision::proceed(Map::new(), "Europe/Madrid"),
                json!({"withChecks": {"proceed": {"tamperingConfig": {}, "timezone": "Europe/Madrid"}}}),
            ),
        ];

        for (decision, expected) in cases {
            assert_eq!(serde_json::to_value(&decision).unwrap(), expected);
        }
    }

    #[test]
    fn test_scene_change_status() {
        assert_eq!(
            TamperingDecision::skip_no_reference().scene_change_status(),
            SceneChangeStatus::NoReferenceImage
        );
        assert_eq!(
            TamperingDecision::period_already_checked().scene_change_status(),
            SceneChangeStatus::PeriodAlreadyChecked
        );
        assert_eq!(
            TamperingDecision::no_checks(vec![]).scene_change_status(),
            SceneChangeStatus::Performed
        );
    }

    #[test]
    fn test_reference_pair_missing() {
        let stored = StoredReference {
            id: "d1".into(),
            created_at: None,
        };
        let pair = ReferencePair {
            day: Some(stored.clone()),
            night: None,
        };
        assert_eq!(pair.missing(), Some(DayPeriod::Night));
        assert_eq!(pair.to_refs(), vec![ReferenceRef::id("d1")]);
        assert!(ReferencePair::default().is_empty());
        assert_eq!(ReferencePair::default().missing(), None);

        let full = ReferencePair {
            day: Some(stored.clone()),
            night: Some(StoredReference { id: "n1".into(), created_at: None }),
        };
        assert_eq!(full.missing(), None);
        assert_eq!(full.to_refs().len(), 2);
    }
}
