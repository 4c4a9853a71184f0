//! Camera view configuration as served by the platform.

use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::features::Features;

/// Everything the orchestrator needs to know about one camera view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    pub id: String,
    pub camera_id: String,
    pub site: SiteInfo,
    pub company: CompanyInfo,
    #[serde(default)]
    pub features: Features,
}

impl ViewConfig {
    /// Company whose capabilities apply: the integrator when there is one.
    pub fn capability_company_id(&self) -> &str {
        self.company
            .integrator_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.company.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInfo {
    pub id: String,
    /// IANA timezone name.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrator_id: Option<String>,
    #[serde(default)]
    pub tampering_schedule: CheckWindow,
}

/// Site-local window in which the periodic tampering check runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckWindow {
    pub first_check_from: ClockTime,
    pub first_check_to: ClockTime,
}

impl Default for CheckWindow {
    fn default() -> Self {
        Self {
            first_check_from: ClockTime::new(8, 0),
            first_check_to: ClockTime::new(10, 0),
        }
    }
}

/// Wall-clock time of day, serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

impl ClockTime {
    pub const fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    pub fn to_naive(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let invalid = || ModelError::InvalidClockTime(value.clone());
        let (hour, minute) = value.split_once(':').ok_or_else(invalid)?;
        let hour: u32 = hour.trim().parse().map_err(|_| invalid())?;
        let minute: u32 = minute.trim().parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }
        Ok(ClockTime { hour, minute })
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_view() -> serde_json::Value {
        json!({
            "id": "view-1",
            "cameraId": "cam-1",
            "site": {"id": "site-1", "timezone": "Europe/Madrid"},
            "company": {
                "id": "company-1",
                "integratorId": "integrator-1",
                "tamperingSchedule": {"firstCheckFrom": "07:30", "firstCheckTo": "09:00"}
            },
            "features": {"personAnalysis": {}}
        })
    }

    #[test]
    fn test_view_config_deserialize() {
        let view: ViewConfig = serde_json::from_value(sample_view()).unwrap();
        assert_eq!(view.capability_company_id(), "integrator-1");
        assert_eq!(view.company.tampering_schedule.first_check_from, ClockTime::new(7, 30));
        assert!(view.features.person_analysis.is_some());
    }

    #[test]
    fn test_owning_company_without_integrator() {
        let mut raw = sample_view();
        raw["company"] = json!({"id": "company-1", "integratorId": ""});
        let view: ViewConfig = serde_json::from_value(raw).unwrap();
        assert_eq!(view.capability_company_id(), "company-1");
        assert_eq!(view.company.tampering_schedule, CheckWindow::default());
    }

    #[test]
    fn test_clock_time_parse() {
        assert_eq!(ClockTime::try_from("06:05".to_string()).unwrap(), ClockTime::new(6, 5));
        assert!(ClockTime::try_from("24:00".to_string()).is_err());
        assert!(ClockTime::try_from("noon".to_string()).is_err());
        assert_eq!(ClockTime::new(9, 0).to_string(), "09:00");
    }
}
