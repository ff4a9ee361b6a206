use crate::models::Coordinate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HazardCategory {
    /// Emergency services on the road (ambulance, police, ...)
    Emergency,
    /// Speed enforcement (mobile checks, fixed cameras, average-speed zones)
    Speed,
    /// Physical road hazards (accidents, roadworks, objects, animals)
    Hazard,
}

impl fmt::Display for HazardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HazardCategory::Emergency => "emergency",
            HazardCategory::Speed => "speed",
            HazardCategory::Hazard => "hazard",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for HazardCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "emergency" => Ok(HazardCategory::Emergency),
            "speed" => Ok(HazardCategory::Speed),
            "hazard" => Ok(HazardCategory::Hazard),
            _ => Err(format!("Invalid hazard category: '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    #[default]
    Active,
    Resolved,
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(AlertStatus::Active),
            "resolved" => Ok(AlertStatus::Resolved),
            _ => Err(format!("Invalid alert status: '{}'", s)),
        }
    }
}

/// Crowd-reported hazard. Owned by the hazard store; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HazardAlert {
    pub id: Uuid,
    pub lat: f64,
    pub lng: f64,
    /// Fine-grained kind, e.g. "fixed_camera" or "roadworks"
    #[serde(rename = "type")]
    pub alert_type: String,
    pub category: HazardCategory,
    #[serde(default)]
    pub status: AlertStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub confirm_count: u32,
    #[serde(default)]
    pub deny_count: u32,
}

impl HazardAlert {
    pub fn location(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            lng: self.lng,
        }
    }

    /// Active and not past its expiry at `now`.
    pub fn is_live_at(&self, now: OffsetDateTime) -> bool {
        self.status == AlertStatus::Active && self.expires_at.map_or(true, |exp| exp > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn alert(expires_in: Option<Duration>, status: AlertStatus) -> HazardAlert {
        let now = OffsetDateTime::now_utc();
        HazardAlert {
            id: Uuid::new_v4(),
            lat: 52.0,
            lng: 5.0,
            alert_type: "roadworks".to_string(),
            category: HazardCategory::Hazard,
            status,
            created_at: now,
            expires_at: expires_in.map(|d| now + d),
            confirm_count: 0,
            deny_count: 0,
        }
    }

    #[test]
    fn test_live_without_expiry() {
        let a = alert(None, AlertStatus::Active);
        assert!(a.is_live_at(OffsetDateTime::now_utc()));
    }

    #[test]
    fn test_expired_alert_is_not_live() {
        let a = alert(Some(Duration::minutes(-1)), AlertStatus::Active);
        assert!(!a.is_live_at(OffsetDateTime::now_utc()));
    }

    #[test]
    fn test_resolved_alert_is_not_live() {
        let a = alert(Some(Duration::minutes(30)), AlertStatus::Resolved);
        assert!(!a.is_live_at(OffsetDateTime::now_utc()));
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!(
            "SPEED".parse::<HazardCategory>().unwrap(),
            HazardCategory::Speed
        );
        assert!("weather".parse::<HazardCategory>().is_err());
        assert_eq!(HazardCategory::Emergency.to_string(), "emergency");
    }

    #[test]
    fn test_deserialize_uses_type_field() {
        let json = r#"{
            "id": "7f0e4b0e-8a55-4d69-9a42-6f3a1d1f0c11",
            "lat": 52.09, "lng": 5.12,
            "type": "fixed_camera", "category": "speed",
            "created_at": "2026-10-14T08:00:00Z"
        }"#;
        let a: HazardAlert = serde_json::from_str(json).unwrap();
        assert_eq!(a.alert_type, "fixed_camera");
        assert_eq!(a.status, AlertStatus::Active);
        assert!(a.expires_at.is_none());
    }
}
