use crate::models::{AlertStatus, Coordinate, HazardAlert};
use serde::Serialize;
use std::collections::HashSet;
use time::OffsetDateTime;
use uuid::Uuid;

/// A hazard the driver should be asked about.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProximityPrompt {
    pub alert: HazardAlert,
    pub distance_meters: f64,
}

/// Emits one prompt per nearby alert, at most once per alert per session.
#[derive(Debug, Clone)]
pub struct ProximityMatcher {
    radius_m: f64,
    shown: HashSet<Uuid>,
}

impl ProximityMatcher {
    pub fn new(radius_m: f64) -> Self {
        ProximityMatcher {
            radius_m,
            shown: HashSet::new(),
        }
    }

    /// Picks the nearest unseen live alert within the radius (inclusive).
    /// Equal distances keep list order.
    pub fn check(
        &mut self,
        position: Coordinate,
        alerts: &[HazardAlert],
        now: OffsetDateTime,
    ) -> Option<ProximityPrompt> {
        let mut best: Option<(&HazardAlert, f64)> = None;

        for alert in alerts {
            if alert.status != AlertStatus::Active
                || !alert.is_live_at(now)
                || self.shown.contains(&alert.id)
            {
                continue;
            }
            let distance = position.distance_to(&alert.location());
            if distance > self.radius_m {
                continue;
            }
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((alert, distance));
            }
        }

        let (alert, distance_meters) = best?;
        self.shown.insert(alert.id);
        tracing::debug!(
            alert_id = %alert.id,
            category = %alert.category,
            distance_m = distance_meters,
            "Hazard proximity prompt"
        );

        Some(ProximityPrompt {
            alert: alert.clone(),
            distance_meters,
        })
    }

    pub fn shown_count(&self) -> usize {
        self.shown.len()
    }

    pub fn reset(&mut self) {
        self.shown.clear();
    }
}
