use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod hazard_repository;
pub mod stats_repository;

pub use hazard_repository::{HazardStore, InMemoryHazardStore, PgHazardStore};
pub use stats_repository::{DriverStatsStore, InMemoryDriverStatsStore, PgDriverStatsStore};

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}
