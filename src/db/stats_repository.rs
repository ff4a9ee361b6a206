use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Per-driver running totals.
#[async_trait]
pub trait DriverStatsStore: Send + Sync {
    async fn add_driven_km(&self, driver_id: Uuid, km: f64) -> Result<()>;

    async fn driven_km(&self, driver_id: Uuid) -> Result<f64>;
}

pub struct PgDriverStatsStore {
    pool: sqlx::PgPool,
}

impl PgDriverStatsStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DriverStatsStore for PgDriverStatsStore {
    async fn add_driven_km(&self, driver_id: Uuid, km: f64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO driver_stats (driver_id, total_km, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (driver_id)
            DO UPDATE SET total_km = driver_stats.total_km + EXCLUDED.total_km,
                          updated_at = NOW()
            "#,
        )
        .bind(driver_id)
        .bind(km)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn driven_km(&self, driver_id: Uuid) -> Result<f64> {
        let total: Option<f64> =
            sqlx::query_scalar("SELECT total_km FROM driver_stats WHERE driver_id = $1")
                .bind(driver_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(total.unwrap_or(0.0))
    }
}

#[derive(Default)]
pub struct InMemoryDriverStatsStore {
    totals: Mutex<HashMap<Uuid, f64>>,
}

#[async_trait]
impl DriverStatsStore for InMemoryDriverStatsStore {
    async fn add_driven_km(&self, driver_id: Uuid, km: f64) -> Result<()> {
        let mut totals = self.totals.lock().unwrap_or_else(|p| p.into_inner());
        *totals.entry(driver_id).or_insert(0.0) += km;
        Ok(())
    }

    async fn driven_km(&self, driver_id: Uuid) -> Result<f64> {
        let totals = self.totals.lock().unwrap_or_else(|p| p.into_inner());
        Ok(totals.get(&driver_id).copied().unwrap_or(0.0))
    }
}
