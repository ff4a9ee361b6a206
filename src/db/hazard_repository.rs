use crate::error::Result;
use crate::models::{AlertStatus, HazardAlert, HazardCategory};
use async_trait::async_trait;
use std::sync::RwLock;
use time::OffsetDateTime;
use uuid::Uuid;

/// Upper bound on alerts loaded per position tick.
const ACTIVE_ALERT_LIMIT: i64 = 500;

/// Read side of the crowd-sourced hazard alerts.
#[async_trait]
pub trait HazardStore: Send + Sync {
    /// Active, non-expired alerts, newest first.
    async fn active_alerts(&self) -> Result<Vec<HazardAlert>>;

    async fn health_check(&self) -> bool;
}

#[derive(sqlx::FromRow)]
struct HazardRow {
    id: Uuid,
    lat: f64,
    lng: f64,
    alert_type: String,
    category: String,
    status: String,
    created_at: OffsetDateTime,
    expires_at: Option<OffsetDateTime>,
    confirm_count: i32,
    deny_count: i32,
}

impl HazardRow {
    fn into_alert(self) -> HazardAlert {
        let category = self.category.parse().unwrap_or_else(|_| {
            tracing::warn!(
                "Invalid hazard category '{}' for alert {}, defaulting to hazard",
                self.category,
                self.id
            );
            HazardCategory::Hazard
        });
        let status = self.status.parse().unwrap_or_else(|_| {
            tracing::warn!(
                "Invalid alert status '{}' for alert {}, treating as resolved",
                self.status,
                self.id
            );
            AlertStatus::Resolved
        });

        HazardAlert {
            id: self.id,
            lat: self.lat,
            lng: self.lng,
            alert_type: self.alert_type,
            category,
            status,
            created_at: self.created_at,
            expires_at: self.expires_at,
            confirm_count: self.confirm_count.max(0) as u32,
            deny_count: self.deny_count.max(0) as u32,
        }
    }
}

pub struct PgHazardStore {
    pool: sqlx::PgPool,
}

impl PgHazardStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HazardStore for PgHazardStore {
    async fn active_alerts(&self) -> Result<Vec<HazardAlert>> {
        let rows = sqlx::query_as::<_, HazardRow>(
            r#"
            SELECT id, lat, lng, alert_type, category, status, created_at, expires_at,
                   confirm_count, deny_count
            FROM hazard_alerts
            WHERE status = 'active'
              AND (expires_at IS NULL OR expires_at > NOW())
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(ACTIVE_ALERT_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let now = OffsetDateTime::now_utc();
        Ok(rows
            .into_iter()
            .map(HazardRow::into_alert)
            .filter(|alert| alert.is_live_at(now))
            .collect())
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// Process-local store, used without a database and in tests.
#[derive(Default)]
pub struct InMemoryHazardStore {
    alerts: RwLock<Vec<HazardAlert>>,
}

impl InMemoryHazardStore {
    pub fn new(alerts: Vec<HazardAlert>) -> Self {
        InMemoryHazardStore {
            alerts: RwLock::new(alerts),
        }
    }

    pub fn replace(&self, alerts: Vec<HazardAlert>) {
        match self.alerts.write() {
            Ok(mut guard) => *guard = alerts,
            Err(poisoned) => *poisoned.into_inner() = alerts,
        }
    }
}

#[async_trait]
impl HazardStore for InMemoryHazardStore {
    async fn active_alerts(&self) -> Result<Vec<HazardAlert>> {
        let now = OffsetDateTime::now_utc();
        let guard = self.alerts.read().unwrap_or_else(|p| p.into_inner());
        let mut alerts: Vec<HazardAlert> = guard
            .iter()
            .filter(|alert| alert.is_live_at(now))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(alerts)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn alert(age_minutes: i64, expires_in: Option<Duration>, status: AlertStatus) -> HazardAlert {
        let now = OffsetDateTime::now_utc();
        HazardAlert {
            id: Uuid::new_v4(),
            lat: 52.09,
            lng: 5.12,
            alert_type: "accident".to_string(),
            category: HazardCategory::Hazard,
            status,
            created_at: now - Duration::minutes(age_minutes),
            expires_at: expires_in.map(|d| now + d),
            confirm_count: 0,
            deny_count: 0,
        }
    }

    #[tokio::test]
    async fn test_in_memory_filters_inactive_and_expired() {
        let live = alert(5, Some(Duration::hours(1)), AlertStatus::Active);
        let store = InMemoryHazardStore::new(vec![
            live.clone(),
            alert(5, Some(Duration::minutes(-1)), AlertStatus::Active),
            alert(5, None, AlertStatus::Resolved),
        ]);

        let alerts = store.active_alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, live.id);
    }

    #[tokio::test]
    async fn test_in_memory_newest_first() {
        let old = alert(60, None, AlertStatus::Active);
        let new = alert(1, None, AlertStatus::Active);
        let store = InMemoryHazardStore::new(vec![old.clone(), new.clone()]);

        let ids: Vec<Uuid> = store.active_alerts().await.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
    }

    #[tokio::test]
    async fn test_replace() {
        let store = InMemoryHazardStore::default();
        assert!(store.active_alerts().await.unwrap().is_empty());
        store.replace(vec![alert(1, None, AlertStatus::Active)]);
        assert_eq!(store.active_alerts().await.unwrap().len(), 1);
    }

    #[test]
    fn test_row_conversion_falls_back_on_bad_values() {
        let row = HazardRow {
            id: Uuid::new_v4(),
            lat: 52.0,
            lng: 5.0,
            alert_type: "flitser".to_string(),
            category: "weather".to_string(),
            status: "pending".to_string(),
            created_at: OffsetDateTime::now_utc(),
            expires_at: None,
            confirm_count: -3,
            deny_count: 2,
        };
        let alert = row.into_alert();
        assert_eq!(alert.category, HazardCategory::Hazard);
        assert_eq!(alert.status, AlertStatus::Resolved);
        assert_eq!(alert.confirm_count, 0);
        assert_eq!(alert.deny_count, 2);
    }
}
